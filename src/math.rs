//! Unbounded-precision number theory used by the Paillier and proof layers.
//!
//! Everything operates on `num_bigint::BigUint`; signed arithmetic only
//! appears inside the extended Euclidean algorithm. Every modular result
//! lies in `[0, m)`.

use crate::Error;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::{CryptoRng, RngCore};

/// Uniform sample in `[0, 2^bits)` from a cryptographically strong source.
pub fn random_bits<R: CryptoRng + RngCore>(rng: &mut R, bits: u64) -> Result<BigUint, Error> {
    if bits == 0 {
        return Ok(BigUint::zero());
    }
    let nbytes = ((bits + 7) / 8) as usize;
    let mut buf = vec![0u8; nbytes];
    rng.try_fill_bytes(&mut buf)?;

    // Mask the excess high bits so the sample is exactly `bits` wide
    let excess = (nbytes as u64 * 8 - bits) as u32;
    buf[0] &= 0xffu8 >> excess;

    Ok(BigUint::from_bytes_be(&buf))
}

/// Uniform sample in `[min, max)` by rejection sampling.
pub fn random_range<R: CryptoRng + RngCore>(
    rng: &mut R,
    min: &BigUint,
    max: &BigUint,
) -> Result<BigUint, Error> {
    if min >= max {
        return Err(Error::BadRange);
    }

    let span = max - min;
    let bits = span.bits();
    loop {
        let candidate = random_bits(rng, bits)?;
        if candidate < span {
            return Ok(min + candidate);
        }
    }
}

/// Modular exponentiation. Defined for `modulus >= 1`; returns `0` when
/// `modulus == 1`.
pub fn mod_pow(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> BigUint {
    if modulus.is_one() {
        return BigUint::zero();
    }
    base.modpow(exponent, modulus)
}

/// Extended Euclidean algorithm: returns `(g, x, y)` with
/// `a*x + b*y == g` and `g >= 0`.
pub fn ext_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_x, mut x) = (BigInt::one(), BigInt::zero());
    let (mut old_y, mut y) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = &old_r / &r;

        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);

        let next_x = &old_x - &q * &x;
        old_x = std::mem::replace(&mut x, next_x);

        let next_y = &old_y - &q * &y;
        old_y = std::mem::replace(&mut y, next_y);
    }

    if old_r.is_negative() {
        return (-old_r, -old_x, -old_y);
    }
    (old_r, old_x, old_y)
}

/// Modular inverse of `a` mod `m`, in `[0, m)`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Result<BigUint, Error> {
    if m.is_zero() {
        return Err(Error::BadRange);
    }

    let (g, x, _) = ext_gcd(&BigInt::from(a.clone()), &BigInt::from(m.clone()));
    if !g.is_one() {
        return Err(Error::NoInverse);
    }

    let m_signed = BigInt::from(m.clone());
    let x = ((x % &m_signed) + &m_signed) % &m_signed;
    Ok(x.to_biguint().expect("reduced inverse is non-negative"))
}

pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    a.gcd(b)
}

/// Least common multiple; `lcm(0, _) == 0`.
pub fn lcm(a: &BigUint, b: &BigUint) -> BigUint {
    a.lcm(b)
}

/// Miller-Rabin probabilistic primality test with `rounds` uniformly drawn
/// witnesses. False-positive probability is at most `4^-rounds`.
pub fn is_probable_prime<R: CryptoRng + RngCore>(
    rng: &mut R,
    n: &BigUint,
    rounds: usize,
) -> Result<bool, Error> {
    let two = BigUint::from(2u32);
    let three = BigUint::from(3u32);

    if n < &two {
        return Ok(false);
    }
    if *n == two || *n == three {
        return Ok(true);
    }
    if n.is_even() {
        return Ok(false);
    }

    // n - 1 = d * 2^r with d odd
    let n_minus_one = n - 1u32;
    let r = n_minus_one
        .trailing_zeros()
        .expect("n - 1 is non-zero for odd n >= 5");
    let d = &n_minus_one >> r;

    'witness: for _ in 0..rounds {
        let a = random_range(rng, &two, &n_minus_one)?;
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 0..r - 1 {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return Ok(false);
    }

    Ok(true)
}

/// Generate a probable prime of exactly `bits` bits.
///
/// The top bit is forced so the candidate has full width and the bottom bit
/// so it is odd; candidates are redrawn until Miller-Rabin passes.
pub fn generate_prime<R: CryptoRng + RngCore>(
    rng: &mut R,
    bits: u64,
    rounds: usize,
) -> Result<BigUint, Error> {
    if bits < 2 {
        return Err(Error::BadRange);
    }

    loop {
        let mut candidate = random_bits(rng, bits)?;
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        if is_probable_prime(rng, &candidate, rounds)? {
            return Ok(candidate);
        }
    }
}

/// Two independently generated distinct primes of `bits` bits each.
pub fn generate_two_primes<R: CryptoRng + RngCore>(
    rng: &mut R,
    bits: u64,
    rounds: usize,
) -> Result<(BigUint, BigUint), Error> {
    let p = generate_prime(rng, bits, rounds)?;
    loop {
        let q = generate_prime(rng, bits, rounds)?;
        if q != p {
            return Ok((p, q));
        }
    }
}

pub fn bit_length(n: &BigUint) -> u64 {
    n.bits()
}

/// The Paillier decryption auxiliary `L(x) = (x - 1) / n`.
///
/// The caller guarantees `x ≡ 1 (mod n)`, which makes the division exact.
pub fn l_function(x: &BigUint, n: &BigUint) -> BigUint {
    (x - 1u32) / n
}
