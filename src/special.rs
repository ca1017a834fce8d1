//! Special mathematical functions.
//!
//! Numerical approximations of the gamma-family functions needed by the
//! maximum-likelihood fits in [`crate::distributions`].

/// Lanczos approximation of ln Γ(x).
///
/// Reference: Lanczos (1964), "A Precision Approximation of the Gamma
/// Function", *SIAM Journal on Numerical Analysis* 1(1).
///
/// # Accuracy
/// Relative error < 2 × 10⁻¹⁰ for x > 0.
///
/// # Examples
/// ```
/// use u_stratify::special::ln_gamma;
/// // Γ(5) = 24
/// assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-10);
/// ```
pub fn ln_gamma(x: f64) -> f64 {
    #[allow(clippy::excessive_precision)]
    const COEFFICIENTS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];
    const G: f64 = 7.0;

    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut sum = COEFFICIENTS[0];
    for (i, &c) in COEFFICIENTS[1..].iter().enumerate() {
        sum += c / (x + i as f64 + 1.0);
    }

    let t = x + G + 0.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Log of the Beta function: `ln B(a, b) = ln Γ(a) + ln Γ(b) − ln Γ(a+b)`.
///
/// # Examples
/// ```
/// use u_stratify::special::ln_beta;
/// // B(1,1) = 1, so ln B(1,1) = 0
/// assert!(ln_beta(1.0, 1.0).abs() < 1e-10);
/// ```
pub fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

// ============================================================================
// Polygamma functions
// ============================================================================

/// Digamma function ψ(x) = d/dx ln Γ(x) for x > 0.
///
/// # Algorithm
/// Shifts the argument above 6 with the recurrence ψ(x) = ψ(x+1) − 1/x,
/// then applies the asymptotic expansion
/// ψ(x) ≈ ln x − 1/(2x) − Σ B₂ₖ/(2k·x²ᵏ).
///
/// Reference: Bernardo (1976), "Algorithm AS 103: Psi (Digamma) Function",
/// *Applied Statistics* 25(3).
///
/// # Returns
/// - `f64::NAN` for `x ≤ 0` or NaN.
///
/// # Examples
/// ```
/// use u_stratify::special::digamma;
/// // ψ(1) = −γ (Euler–Mascheroni)
/// assert!((digamma(1.0) + 0.5772156649015329).abs() < 1e-10);
/// ```
pub fn digamma(x: f64) -> f64 {
    if x.is_nan() || x <= 0.0 {
        return f64::NAN;
    }
    let mut x = x;
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    // Bernoulli terms B₂/2, B₄/4, B₆/6, B₈/8, B₁₀/10
    let series = inv2
        * (1.0 / 12.0
            - inv2 * (1.0 / 120.0 - inv2 * (1.0 / 252.0 - inv2 * (1.0 / 240.0 - inv2 / 132.0))));
    result + x.ln() - 0.5 * inv - series
}

/// Trigamma function ψ₁(x) = d²/dx² ln Γ(x) for x > 0.
///
/// # Algorithm
/// Recurrence ψ₁(x) = ψ₁(x+1) + 1/x² up to x ≥ 6, then the asymptotic
/// expansion ψ₁(x) ≈ 1/x + 1/(2x²) + Σ B₂ₖ/x²ᵏ⁺¹.
///
/// Reference: Schneider (1978), "Algorithm AS 121: Trigamma Function",
/// *Applied Statistics* 27(1).
///
/// # Returns
/// - `f64::NAN` for `x ≤ 0` or NaN.
///
/// # Examples
/// ```
/// use u_stratify::special::trigamma;
/// // ψ₁(1) = π²/6
/// let expected = std::f64::consts::PI.powi(2) / 6.0;
/// assert!((trigamma(1.0) - expected).abs() < 1e-8);
/// ```
pub fn trigamma(x: f64) -> f64 {
    if x.is_nan() || x <= 0.0 {
        return f64::NAN;
    }
    let mut x = x;
    let mut result = 0.0;
    while x < 6.0 {
        result += 1.0 / (x * x);
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    // B₂ = 1/6, B₄ = −1/30, B₆ = 1/42, B₈ = −1/30, B₁₀ = 5/66
    let series = 1.0 / 6.0
        - inv2 * (1.0 / 30.0 - inv2 * (1.0 / 42.0 - inv2 * (1.0 / 30.0 - inv2 * 5.0 / 66.0)));
    result + inv + 0.5 * inv2 + inv * inv2 * series
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EULER_GAMMA: f64 = 0.5772156649015329;

    #[test]
    fn test_ln_gamma_integers() {
        // Γ(n) = (n-1)!
        let factorials = [1.0, 1.0, 2.0, 6.0, 24.0, 120.0, 720.0];
        for (i, &f) in factorials.iter().enumerate() {
            let n = (i + 1) as f64;
            assert!(
                (ln_gamma(n) - f64::ln(f)).abs() < 1e-10,
                "ln Γ({n}) mismatch"
            );
        }
    }

    #[test]
    fn test_ln_gamma_half() {
        // Γ(0.5) = √π
        let expected = std::f64::consts::PI.sqrt().ln();
        assert!((ln_gamma(0.5) - expected).abs() < 1e-10);
    }

    #[test]
    fn test_ln_beta_symmetric() {
        assert!((ln_beta(2.0, 5.0) - ln_beta(5.0, 2.0)).abs() < 1e-12);
        // B(2,3) = 1!·2!/4! = 1/12
        assert!((ln_beta(2.0, 3.0) - (1.0_f64 / 12.0).ln()).abs() < 1e-10);
    }

    #[test]
    fn test_digamma_known_values() {
        assert!((digamma(1.0) + EULER_GAMMA).abs() < 1e-10);
        // ψ(1/2) = −γ − 2 ln 2
        let expected = -EULER_GAMMA - 2.0 * std::f64::consts::LN_2;
        assert!((digamma(0.5) - expected).abs() < 1e-10);
        // ψ(n+1) = ψ(n) + 1/n
        assert!((digamma(4.0) - digamma(3.0) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_digamma_invalid() {
        assert!(digamma(0.0).is_nan());
        assert!(digamma(-1.5).is_nan());
        assert!(digamma(f64::NAN).is_nan());
    }

    #[test]
    fn test_trigamma_known_values() {
        let pi2 = std::f64::consts::PI.powi(2);
        assert!((trigamma(1.0) - pi2 / 6.0).abs() < 1e-8);
        // ψ₁(1/2) = π²/2
        assert!((trigamma(0.5) - pi2 / 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_trigamma_large_argument() {
        // ψ₁(x) ~ 1/x for large x
        let x = 1e6;
        assert!((trigamma(x) * x - 1.0).abs() < 1e-5);
    }
}
