//! Arithmetic and elementary functions with linear error propagation.

use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::obs::Obs;

fn add(a: &Obs, b: &Obs) -> Obs {
    Obs::linear(&[a, b], a.value() + b.value(), &[1.0, 1.0])
}

fn sub(a: &Obs, b: &Obs) -> Obs {
    Obs::linear(&[a, b], a.value() - b.value(), &[1.0, -1.0])
}

fn mul(a: &Obs, b: &Obs) -> Obs {
    Obs::linear(&[a, b], a.value() * b.value(), &[b.value(), a.value()])
}

fn div(a: &Obs, b: &Obs) -> Obs {
    let inverse = 1.0 / b.value();
    Obs::linear(
        &[a, b],
        a.value() * inverse,
        &[inverse, -a.value() * inverse * inverse],
    )
}

macro_rules! obs_binary {
    ($trait:ident, $method:ident, $func:ident) => {
        impl $trait<&Obs> for &Obs {
            type Output = Obs;
            fn $method(self, rhs: &Obs) -> Obs {
                $func(self, rhs)
            }
        }

        impl $trait<Obs> for Obs {
            type Output = Obs;
            fn $method(self, rhs: Obs) -> Obs {
                $func(&self, &rhs)
            }
        }

        impl $trait<&Obs> for Obs {
            type Output = Obs;
            fn $method(self, rhs: &Obs) -> Obs {
                $func(&self, rhs)
            }
        }

        impl $trait<Obs> for &Obs {
            type Output = Obs;
            fn $method(self, rhs: Obs) -> Obs {
                $func(self, &rhs)
            }
        }
    };
}

obs_binary!(Add, add, add);
obs_binary!(Sub, sub, sub);
obs_binary!(Mul, mul, mul);
obs_binary!(Div, div, div);

macro_rules! obs_scalar {
    ($trait:ident, $method:ident, |$obs:ident, $x:ident| $lhs:expr, |$obs2:ident, $y:ident| $rhs:expr) => {
        impl $trait<f64> for &Obs {
            type Output = Obs;
            fn $method(self, $x: f64) -> Obs {
                let $obs = self;
                $lhs
            }
        }

        impl $trait<f64> for Obs {
            type Output = Obs;
            fn $method(self, $x: f64) -> Obs {
                let $obs = &self;
                $lhs
            }
        }

        impl $trait<&Obs> for f64 {
            type Output = Obs;
            fn $method(self, rhs: &Obs) -> Obs {
                let ($obs2, $y) = (rhs, self);
                $rhs
            }
        }

        impl $trait<Obs> for f64 {
            type Output = Obs;
            fn $method(self, rhs: Obs) -> Obs {
                let ($obs2, $y) = (&rhs, self);
                $rhs
            }
        }
    };
}

obs_scalar!(Add, add, |o, x| o.affine(1.0, x), |o, y| o.affine(1.0, y));
obs_scalar!(Sub, sub, |o, x| o.affine(1.0, -x), |o, y| o.affine(-1.0, y));
obs_scalar!(Mul, mul, |o, x| o.affine(x, 0.0), |o, y| o.affine(y, 0.0));
obs_scalar!(
    Div,
    div,
    |o, x| o.affine(1.0 / x, 0.0),
    |o, y| o.apply(y / o.value(), -y / (o.value() * o.value()))
);

impl Neg for &Obs {
    type Output = Obs;
    fn neg(self) -> Obs {
        self.affine(-1.0, 0.0)
    }
}

impl Neg for Obs {
    type Output = Obs;
    fn neg(self) -> Obs {
        self.affine(-1.0, 0.0)
    }
}

impl Sum for Obs {
    fn sum<I: Iterator<Item = Obs>>(iter: I) -> Obs {
        iter.fold(Obs::constant(0.0), |acc, item| acc + item)
    }
}

impl<'a> Sum<&'a Obs> for Obs {
    fn sum<I: Iterator<Item = &'a Obs>>(iter: I) -> Obs {
        iter.fold(Obs::constant(0.0), |acc, item| acc + item)
    }
}

impl Obs {
    /// Exponential.
    pub fn exp(&self) -> Obs {
        let value = self.value().exp();
        self.apply(value, value)
    }

    /// Natural logarithm.
    pub fn ln(&self) -> Obs {
        self.apply(self.value().ln(), 1.0 / self.value())
    }

    /// Square root.
    pub fn sqrt(&self) -> Obs {
        let value = self.value().sqrt();
        self.apply(value, 0.5 / value)
    }

    /// Real power.
    pub fn powf(&self, exponent: f64) -> Obs {
        let x = self.value();
        self.apply(x.powf(exponent), exponent * x.powf(exponent - 1.0))
    }

    /// Integer power.
    pub fn powi(&self, exponent: i32) -> Obs {
        let x = self.value();
        self.apply(x.powi(exponent), f64::from(exponent) * x.powi(exponent - 1))
    }

    /// Absolute value.
    pub fn abs(&self) -> Obs {
        let sign = if self.value() < 0.0 { -1.0 } else { 1.0 };
        self.affine(sign, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(samples: &[f64]) -> Obs {
        Obs::from_samples(samples.to_vec(), "ens").expect("obs")
    }

    #[test]
    fn difference_with_itself_vanishes() {
        let a = obs(&[1.0, 2.0, 3.0, 2.0, 1.0, 2.5]);
        let diff = &a - &a;
        assert_eq!(diff.value(), 0.0);
        assert!(diff.series()["ens"].deltas().iter().all(|d| d.abs() < 1e-15));
        assert_eq!(diff.dvalue(), 0.0);
    }

    #[test]
    fn scalar_operations_scale_the_error() {
        let a = obs(&[1.0, 2.0, 3.0, 2.0, 1.0, 2.5, 0.5, 1.5]);
        let scaled = 3.0 * &a + 1.0;
        assert!((scaled.value() - (3.0 * a.value() + 1.0)).abs() < 1e-12);
        assert!((scaled.dvalue() - 3.0 * a.dvalue()).abs() < 1e-12);
        let halved = &a / 2.0;
        assert!((halved.dvalue() - 0.5 * a.dvalue()).abs() < 1e-12);
    }

    #[test]
    fn product_follows_the_chain_rule() {
        let a = obs(&[1.0, 2.0, 3.0, 2.0, 1.0, 2.5]);
        let squared = &a * &a;
        let power = a.powi(2);
        assert!((squared.value() - power.value()).abs() < 1e-12);
        for (x, y) in squared.series()["ens"]
            .deltas()
            .iter()
            .zip(power.series()["ens"].deltas())
        {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn exp_and_ln_are_inverse() {
        let a = obs(&[1.0, 2.0, 3.0, 2.0, 1.0, 2.5]);
        let round = a.exp().ln();
        assert!((round.value() - a.value()).abs() < 1e-12);
        assert!((round.dvalue() - a.dvalue()).abs() < 1e-12);
    }

    #[test]
    fn sum_of_observables() {
        let items = vec![Obs::constant(1.0), Obs::constant(2.0), Obs::constant(3.5)];
        let total: Obs = items.iter().sum();
        assert_eq!(total.value(), 6.5);
        assert!(total.is_constant());
    }
}
