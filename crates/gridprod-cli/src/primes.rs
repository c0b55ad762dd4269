//! Feasibility probe: primes in `(n²/2, n²)`.
//!
//! Such a prime divides exactly one cell value in an order-n grid (the prime
//! itself: its smallest multiple past itself already exceeds n²), so only
//! the row and column holding that cell can carry it in their products.

/// Sieve of Eratosthenes over `0..=limit`.
fn sieve(limit: usize) -> Vec<u64> {
    if limit < 2 {
        return Vec::new();
    }
    let mut is_prime = vec![true; limit + 1];
    is_prime[0] = false;
    is_prime[1] = false;
    let mut i = 2;
    while i * i <= limit {
        if is_prime[i] {
            let mut j = i * i;
            while j <= limit {
                is_prime[j] = false;
                j += i;
            }
        }
        i += 1;
    }
    is_prime
        .iter()
        .enumerate()
        .filter_map(|(k, &prime)| prime.then_some(k as u64))
        .collect()
}

/// Primes strictly between `n²/2` and `n²`.
pub fn primes_in_range(n: u32) -> Vec<u64> {
    let upper = u64::from(n) * u64::from(n);
    let lower = upper / 2;
    sieve(upper as usize)
        .into_iter()
        .filter(|&p| p > lower && p < upper)
        .collect()
}

pub fn run(n: u32) {
    let upper = u64::from(n) * u64::from(n);
    let primes = primes_in_range(n);
    println!(
        "For n={n}: {} prime(s) in ({}, {})",
        primes.len(),
        upper / 2,
        upper
    );
    for p in primes {
        println!("  {p}");
    }
}
