//! Keyframe animation engine (component C).

pub mod easing;

use crate::error::{EngineError, Result};
use crate::image::ColorSpace;
use crate::math::{self, Quat, Vec2, Vec3, Vec4};
use crate::path::Path;
use easing::Easing;
use std::cell::Cell;

/// Per-keyframe easing selection and parameters.
#[derive(Copy, Clone, Debug)]
pub struct EasingParams {
    pub easing: Easing,
    /// Exponent for `Power*`, overshoot for `Back*`; unused otherwise.
    pub param: f32,
}

impl Default for EasingParams {
    fn default() -> Self {
        EasingParams {
            easing: Easing::Linear,
            param: 0.0,
        }
    }
}

/// One keyframe: a time, a typed value, and the easing used to reach it
/// from the previous keyframe.
#[derive(Clone, Debug)]
pub struct KeyFrame<T> {
    pub time: f64,
    pub value: T,
    pub easing: EasingParams,
}

/// A typed animation: an immutable keyframe table plus per-instance
/// evaluation state (a cached segment index for amortized forward lookup).
pub struct Animation<T> {
    keyframes: Vec<KeyFrame<T>>,
    cached_index: Cell<usize>,
    color_space: ColorSpace,
}

fn validate_times<T>(keyframes: &[KeyFrame<T>]) -> Result<()> {
    if keyframes.is_empty() {
        return Err(EngineError::InvalidArg);
    }
    if keyframes.windows(2).any(|w| w[0].time > w[1].time) {
        return Err(EngineError::InvalidArg);
    }
    Ok(())
}

impl<T> Animation<T> {
    pub fn new(keyframes: Vec<KeyFrame<T>>) -> Result<Animation<T>> {
        validate_times(&keyframes)?;
        Ok(Animation {
            keyframes,
            cached_index: Cell::new(0),
            color_space: ColorSpace::Srgb,
        })
    }

    pub fn with_color_space(mut self, space: ColorSpace) -> Self {
        self.color_space = space;
        self
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn keyframes(&self) -> &[KeyFrame<T>] {
        &self.keyframes
    }

    /// Locates `(index, ratio)` such that `t` lies between keyframe `index`
    /// and `index + 1`, remapped through the segment's easing. Returns
    /// `None` when `t` is outside the keyframe range (caller uses the first
    /// or last keyframe's value directly).
    fn locate(&self, t: f64) -> Option<(usize, f32)> {
        let first = self.keyframes.first().unwrap();
        let last = self.keyframes.last().unwrap();
        if t <= first.time {
            return None;
        }
        if t >= last.time {
            return None;
        }

        let mut idx = self.cached_index.get().min(self.keyframes.len() - 2);
        if !(self.keyframes[idx].time <= t && t <= self.keyframes[idx + 1].time) {
            idx = match self
                .keyframes
                .binary_search_by(|kf| kf.time.partial_cmp(&t).unwrap())
            {
                Ok(i) => i.min(self.keyframes.len() - 2),
                Err(i) => i.saturating_sub(1).min(self.keyframes.len() - 2),
            };
        }
        self.cached_index.set(idx);

        let t0 = self.keyframes[idx].time;
        let t1 = self.keyframes[idx + 1].time;
        let raw = math::linear_norm(t as f32, t0 as f32, t1 as f32);
        let eased = self.keyframes[idx + 1]
            .easing
            .easing
            .forward(raw, self.keyframes[idx + 1].easing.param);
        Some((idx, eased))
    }
}

/// Implemented once per animatable value type; binds the "mix" and "copy"
/// strategy for that type.
pub trait Animatable: Sized + Clone {
    fn mix(a: &Self, b: &Self, r: f32, space: ColorSpace) -> Self;
}

impl Animatable for f32 {
    fn mix(a: &Self, b: &Self, r: f32, _space: ColorSpace) -> Self {
        math::mix(*a, *b, r)
    }
}

impl Animatable for Vec2 {
    fn mix(a: &Self, b: &Self, r: f32, _space: ColorSpace) -> Self {
        math::vec2_lerp(*a, *b, r)
    }
}

impl Animatable for Vec3 {
    fn mix(a: &Self, b: &Self, r: f32, _space: ColorSpace) -> Self {
        math::vec3_lerp(*a, *b, r)
    }
}

impl Animatable for Vec4 {
    fn mix(a: &Self, b: &Self, r: f32, _space: ColorSpace) -> Self {
        math::vec4_lerp(*a, *b, r)
    }
}

/// Unit quaternion: mixed via `slerp`, not a component-wise lerp.
#[derive(Copy, Clone, Debug)]
pub struct AnimQuat(pub Quat);

impl Animatable for AnimQuat {
    fn mix(a: &Self, b: &Self, r: f32, _space: ColorSpace) -> Self {
        AnimQuat(math::quat_slerp(a.0, b.0, r))
    }
}

/// sRGB color, mixed by converting both endpoints to linear RGB in the
/// animation's declared color space, lerping, then re-encoding to sRGB.
#[derive(Copy, Clone, Debug)]
pub struct AnimColor(pub Vec4);

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn rgb_to_hsl(c: Vec3) -> Vec3 {
    let (r, g, b) = (c[0], c[1], c[2]);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if (max - min).abs() < 1e-8 {
        return [0.0, 0.0, l];
    }
    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    } / 6.0;
    [h, s, l]
}

fn hsl_to_rgb(c: Vec3) -> Vec3 {
    let (h, s, l) = (c[0], c[1], c[2]);
    if s.abs() < 1e-8 {
        return [l, l, l];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue_to_rgb = |p: f32, q: f32, mut t: f32| -> f32 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 1.0 / 2.0 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    [
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    ]
}

impl AnimColor {
    fn to_linear(self, space: ColorSpace) -> Vec4 {
        match space {
            ColorSpace::Linear => self.0,
            ColorSpace::Srgb | ColorSpace::Hsv => {
                let rgb = [self.0[0], self.0[1], self.0[2]];
                let lin = rgb.map(srgb_to_linear);
                [lin[0], lin[1], lin[2], self.0[3]]
            }
        }
    }

    fn from_linear(lin: Vec4, space: ColorSpace) -> AnimColor {
        match space {
            ColorSpace::Linear => AnimColor(lin),
            ColorSpace::Srgb | ColorSpace::Hsv => {
                let rgb = [lin[0], lin[1], lin[2]].map(linear_to_srgb);
                AnimColor([rgb[0], rgb[1], rgb[2], lin[3]])
            }
        }
    }
}

impl Animatable for AnimColor {
    fn mix(a: &Self, b: &Self, r: f32, space: ColorSpace) -> Self {
        let la = a.to_linear(space);
        let lb = b.to_linear(space);
        let lerped = math::vec4_lerp(la, lb, r);
        Self::from_linear(lerped, space)
    }
}

/// HSL-space color variant: mixes hue/saturation/lightness directly rather
/// than converting through linear RGB.
#[derive(Copy, Clone, Debug)]
pub struct AnimColorHsl(pub Vec4);

impl Animatable for AnimColorHsl {
    fn mix(a: &Self, b: &Self, r: f32, _space: ColorSpace) -> Self {
        let ha = rgb_to_hsl([a.0[0], a.0[1], a.0[2]]);
        let hb = rgb_to_hsl([b.0[0], b.0[1], b.0[2]]);
        let h = math::vec3_lerp(ha, hb, r);
        let rgb = hsl_to_rgb(h);
        AnimColorHsl([rgb[0], rgb[1], rgb[2], math::mix(a.0[3], b.0[3], r)])
    }
}

fn rgb_to_hsv(c: Vec3) -> Vec3 {
    let (r, g, b) = (c[0], c[1], c[2]);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;
    let v = max;
    let s = if max.abs() < 1e-8 { 0.0 } else { d / max };
    if d.abs() < 1e-8 {
        return [0.0, s, v];
    }
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    } / 6.0;
    [h, s, v]
}

fn hsv_to_rgb(c: Vec3) -> Vec3 {
    let (h, s, v) = (c[0], c[1], c[2]);
    if s.abs() < 1e-8 {
        return [v, v, v];
    }
    let h6 = (h - h.floor()) * 6.0;
    let i = h6.floor() as i32;
    let f = h6 - i as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i.rem_euclid(6) {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// HSV-space color variant: mixes hue/saturation/value directly rather than
/// converting through linear RGB.
#[derive(Copy, Clone, Debug)]
pub struct AnimColorHsv(pub Vec4);

impl Animatable for AnimColorHsv {
    fn mix(a: &Self, b: &Self, r: f32, _space: ColorSpace) -> Self {
        let ha = rgb_to_hsv([a.0[0], a.0[1], a.0[2]]);
        let hb = rgb_to_hsv([b.0[0], b.0[1], b.0[2]]);
        let h = math::vec3_lerp(ha, hb, r);
        let rgb = hsv_to_rgb(h);
        AnimColorHsv([rgb[0], rgb[1], rgb[2], math::mix(a.0[3], b.0[3], r)])
    }
}

impl<T: Animatable> Animation<T> {
    /// `evaluate(t)`: copy the first/last keyframe's value outside the
    /// range; otherwise mix across the located segment.
    pub fn evaluate(&self, t: f64) -> T {
        match self.locate(t) {
            None if t <= self.keyframes.first().unwrap().time => {
                self.keyframes.first().unwrap().value.clone()
            }
            None => self.keyframes.last().unwrap().value.clone(),
            Some((idx, r)) => T::mix(
                &self.keyframes[idx].value,
                &self.keyframes[idx + 1].value,
                r,
                self.color_space,
            ),
        }
    }
}

/// `AnimatedPath`: the mixed scalar selects a normalized distance into a
/// shared [`Path`], rather than mixing positions directly.
pub struct AnimatedPath {
    animation: Animation<f32>,
    path: std::rc::Rc<Path>,
}

impl AnimatedPath {
    pub fn new(animation: Animation<f32>, path: std::rc::Rc<Path>) -> AnimatedPath {
        AnimatedPath { animation, path }
    }

    pub fn evaluate(&self, t: f64) -> Vec3 {
        let s = self.animation.evaluate(t);
        self.path.evaluate(s)
    }
}

/// Locates the segment a velocity evaluation falls in and its eased
/// derivative factor, independent of the keyframe value type. `None` outside
/// the keyframe range or across a zero-length segment (velocity is zero).
fn velocity_segment<T>(kfs: &[KeyFrame<T>], t: f64) -> Option<(usize, f32, f32)> {
    let first = kfs.first().unwrap();
    let last = kfs.last().unwrap();
    if t <= first.time || t >= last.time {
        return None;
    }
    let idx = match kfs.binary_search_by(|kf| kf.time.partial_cmp(&t).unwrap()) {
        Ok(i) => i.min(kfs.len() - 2),
        Err(i) => i.saturating_sub(1).min(kfs.len() - 2),
    };
    let t0 = kfs[idx].time;
    let t1 = kfs[idx + 1].time;
    let span = (t1 - t0) as f32;
    if span == 0.0 {
        return None;
    }
    let raw = math::linear_norm(t as f32, t0 as f32, t1 as f32);
    let d_easing = kfs[idx + 1].easing.easing.derivative(raw, kfs[idx + 1].easing.param);
    Some((idx, d_easing, span))
}

/// A velocity node: the derivative of a matching animation at time `t`.
/// Outside the keyframe range the velocity is zero.
pub fn velocity(animation: &Animation<f32>, t: f64) -> f32 {
    let kfs = animation.keyframes();
    match velocity_segment(kfs, t) {
        None => 0.0,
        Some((idx, d_easing, span)) => (kfs[idx + 1].value - kfs[idx].value) * d_easing / span,
    }
}

pub fn velocity_vec2(animation: &Animation<Vec2>, t: f64) -> Vec2 {
    let kfs = animation.keyframes();
    match velocity_segment(kfs, t) {
        None => [0.0, 0.0],
        Some((idx, d_easing, span)) => math::vec2_scale(math::vec2_sub(kfs[idx + 1].value, kfs[idx].value), d_easing / span),
    }
}

pub fn velocity_vec3(animation: &Animation<Vec3>, t: f64) -> Vec3 {
    let kfs = animation.keyframes();
    match velocity_segment(kfs, t) {
        None => [0.0, 0.0, 0.0],
        Some((idx, d_easing, span)) => math::vec3_scale(math::vec3_sub(kfs[idx + 1].value, kfs[idx].value), d_easing / span),
    }
}

pub fn velocity_vec4(animation: &Animation<Vec4>, t: f64) -> Vec4 {
    let kfs = animation.keyframes();
    match velocity_segment(kfs, t) {
        None => [0.0, 0.0, 0.0, 0.0],
        Some((idx, d_easing, span)) => math::vec4_scale(math::vec4_sub(kfs[idx + 1].value, kfs[idx].value), d_easing / span),
    }
}

/// Validates a `TimeAnimation`: must use `Linear` easing throughout and
/// have strictly non-decreasing values (it remaps time, so going backwards
/// is never meaningful).
pub fn validate_time_animation(keyframes: &[KeyFrame<f32>]) -> Result<()> {
    validate_times(keyframes)?;
    if keyframes
        .iter()
        .any(|kf| !matches!(kf.easing.easing, Easing::Linear))
    {
        return Err(EngineError::InvalidArg);
    }
    if keyframes.windows(2).any(|w| w[0].value > w[1].value) {
        return Err(EngineError::InvalidArg);
    }
    Ok(())
}
