//! Easing functions: each has a forward curve, a derivative (for velocity
//! nodes), and — where the curve is monotonic and invertible — a
//! resolution used to rescale keyframe boundary ranges.

use std::f32::consts::PI;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Easing {
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
    QuadraticOutIn,
    CubicIn,
    CubicOut,
    CubicInOut,
    CubicOutIn,
    QuarticIn,
    QuarticOut,
    QuarticInOut,
    QuarticOutIn,
    QuinticIn,
    QuinticOut,
    QuinticInOut,
    QuinticOutIn,
    PowerIn,
    PowerOut,
    PowerInOut,
    PowerOutIn,
    SinusIn,
    SinusOut,
    SinusInOut,
    SinusOutIn,
    ExpIn,
    ExpOut,
    ExpInOut,
    ExpOutIn,
    CircularIn,
    CircularOut,
    CircularInOut,
    CircularOutIn,
    BounceIn,
    BounceOut,
    ElasticIn,
    ElasticOut,
    BackIn,
    BackOut,
    BackInOut,
    BackOutIn,
}

fn power_in(t: f32, n: f32) -> f32 {
    t.powf(n)
}
fn power_out(t: f32, n: f32) -> f32 {
    1.0 - (1.0 - t).powf(n)
}
fn power_in_out(t: f32, n: f32) -> f32 {
    if t < 0.5 {
        power_in(2.0 * t, n) / 2.0
    } else {
        power_out(2.0 * t - 1.0, n) / 2.0 + 0.5
    }
}
fn power_out_in(t: f32, n: f32) -> f32 {
    if t < 0.5 {
        power_out(2.0 * t, n) / 2.0
    } else {
        power_in(2.0 * t - 1.0, n) / 2.0 + 0.5
    }
}

fn power_in_deriv(t: f32, n: f32) -> f32 {
    n * t.powf(n - 1.0)
}
fn power_out_deriv(t: f32, n: f32) -> f32 {
    n * (1.0 - t).powf(n - 1.0)
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}
fn bounce_in(t: f32) -> f32 {
    1.0 - bounce_out(1.0 - t)
}

fn elastic_out(t: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let c4 = (2.0 * PI) / 3.0;
    2.0f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
}
fn elastic_in(t: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let c4 = (2.0 * PI) / 3.0;
    -(2.0f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * c4).sin()
}

fn back_in(t: f32, s: f32) -> f32 {
    t * t * ((s + 1.0) * t - s)
}
fn back_out(t: f32, s: f32) -> f32 {
    let t = t - 1.0;
    t * t * ((s + 1.0) * t + s) + 1.0
}
fn back_in_out(t: f32, s: f32) -> f32 {
    let s = s * 1.525;
    if t < 0.5 {
        let t = t * 2.0;
        (t * t * ((s + 1.0) * t - s)) / 2.0
    } else {
        let t = t * 2.0 - 2.0;
        (t * t * ((s + 1.0) * t + s) + 2.0) / 2.0
    }
}
fn back_out_in(t: f32, s: f32) -> f32 {
    if t < 0.5 {
        back_out(2.0 * t, s) / 2.0
    } else {
        back_in(2.0 * t - 1.0, s) / 2.0 + 0.5
    }
}

impl Easing {
    /// Evaluates the easing curve at `t in [0,1]`. `param` carries the
    /// keyframe-supplied exponent (`Power*`) or overshoot (`Back*`); it is
    /// ignored by every other variant.
    pub fn forward(self, t: f32, param: f32) -> f32 {
        use Easing::*;
        match self {
            Linear => t,
            QuadraticIn => power_in(t, 2.0),
            QuadraticOut => power_out(t, 2.0),
            QuadraticInOut => power_in_out(t, 2.0),
            QuadraticOutIn => power_out_in(t, 2.0),
            CubicIn => power_in(t, 3.0),
            CubicOut => power_out(t, 3.0),
            CubicInOut => power_in_out(t, 3.0),
            CubicOutIn => power_out_in(t, 3.0),
            QuarticIn => power_in(t, 4.0),
            QuarticOut => power_out(t, 4.0),
            QuarticInOut => power_in_out(t, 4.0),
            QuarticOutIn => power_out_in(t, 4.0),
            QuinticIn => power_in(t, 5.0),
            QuinticOut => power_out(t, 5.0),
            QuinticInOut => power_in_out(t, 5.0),
            QuinticOutIn => power_out_in(t, 5.0),
            PowerIn => power_in(t, param),
            PowerOut => power_out(t, param),
            PowerInOut => power_in_out(t, param),
            PowerOutIn => power_out_in(t, param),
            SinusIn => 1.0 - (t * PI / 2.0).cos(),
            SinusOut => (t * PI / 2.0).sin(),
            SinusInOut => -((PI * t).cos() - 1.0) / 2.0,
            SinusOutIn => {
                if t < 0.5 {
                    (2.0 * t * PI / 2.0).sin() / 2.0
                } else {
                    (1.0 - ((2.0 * t - 1.0) * PI / 2.0).cos()) / 2.0 + 0.5
                }
            }
            ExpIn => {
                if t == 0.0 {
                    0.0
                } else {
                    2.0f32.powf(10.0 * t - 10.0)
                }
            }
            ExpOut => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2.0f32.powf(-10.0 * t)
                }
            }
            ExpInOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    2.0f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2.0f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            ExpOutIn => {
                if t < 0.5 {
                    Easing::ExpOut.forward(2.0 * t, param) / 2.0
                } else {
                    Easing::ExpIn.forward(2.0 * t - 1.0, param) / 2.0 + 0.5
                }
            }
            CircularIn => 1.0 - (1.0 - t * t).sqrt(),
            CircularOut => (1.0 - (t - 1.0) * (t - 1.0)).sqrt(),
            CircularInOut => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            CircularOutIn => {
                if t < 0.5 {
                    Easing::CircularOut.forward(2.0 * t, param) / 2.0
                } else {
                    Easing::CircularIn.forward(2.0 * t - 1.0, param) / 2.0 + 0.5
                }
            }
            BounceIn => bounce_in(t),
            BounceOut => bounce_out(t),
            ElasticIn => elastic_in(t),
            ElasticOut => elastic_out(t),
            BackIn => back_in(t, param),
            BackOut => back_out(t, param),
            BackInOut => back_in_out(t, param),
            BackOutIn => back_out_in(t, param),
        }
    }

    /// Derivative of `forward` with respect to `t`, used by velocity nodes.
    /// Curves without a convenient closed form (bounce, elastic, back) use
    /// a centered finite difference.
    pub fn derivative(self, t: f32, param: f32) -> f32 {
        use Easing::*;
        match self {
            Linear => 1.0,
            QuadraticIn => power_in_deriv(t, 2.0),
            QuadraticOut => power_out_deriv(t, 2.0),
            CubicIn => power_in_deriv(t, 3.0),
            CubicOut => power_out_deriv(t, 3.0),
            QuarticIn => power_in_deriv(t, 4.0),
            QuarticOut => power_out_deriv(t, 4.0),
            QuinticIn => power_in_deriv(t, 5.0),
            QuinticOut => power_out_deriv(t, 5.0),
            PowerIn => power_in_deriv(t, param),
            PowerOut => power_out_deriv(t, param),
            SinusIn => (t * PI / 2.0).sin() * PI / 2.0,
            SinusOut => (t * PI / 2.0).cos() * PI / 2.0,
            _ => {
                let h = 1e-3;
                let lo = (t - h).max(0.0);
                let hi = (t + h).min(1.0);
                (self.forward(hi, param) - self.forward(lo, param)) / (hi - lo).max(1e-6)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_identity() {
        assert_eq!(Easing::Linear.forward(0.3, 0.0), 0.3);
        assert_eq!(Easing::Linear.derivative(0.3, 0.0), 1.0);
    }

    #[test]
    fn every_easing_maps_endpoints_to_zero_and_one() {
        let all = [
            Easing::Linear, Easing::QuadraticIn, Easing::QuadraticOut, Easing::QuadraticInOut,
            Easing::QuadraticOutIn, Easing::CubicIn, Easing::CubicOut, Easing::CubicInOut,
            Easing::CubicOutIn, Easing::QuarticIn, Easing::QuarticOut, Easing::QuarticInOut,
            Easing::QuarticOutIn, Easing::QuinticIn, Easing::QuinticOut, Easing::QuinticInOut,
            Easing::QuinticOutIn, Easing::SinusIn, Easing::SinusOut, Easing::SinusInOut,
            Easing::CircularIn, Easing::CircularOut, Easing::CircularInOut,
            Easing::BounceIn, Easing::BounceOut, Easing::ElasticIn, Easing::ElasticOut,
            Easing::BackIn, Easing::BackOut, Easing::BackInOut,
        ];
        for e in all {
            let p = if matches!(e, Easing::BackIn | Easing::BackOut | Easing::BackInOut) {
                1.70158
            } else {
                2.0
            };
            assert!(e.forward(0.0, p).abs() < 1e-4, "{:?} at 0", e);
            assert!((e.forward(1.0, p) - 1.0).abs() < 1e-4, "{:?} at 1", e);
        }
    }

    #[test]
    fn power_in_matches_quadratic_with_exponent_two() {
        assert!((Easing::PowerIn.forward(0.5, 2.0) - Easing::QuadraticIn.forward(0.5, 0.0)).abs() < 1e-6);
    }
}
