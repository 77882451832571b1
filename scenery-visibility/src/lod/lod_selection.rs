use super::{LodLightScheme, LodModelScheme, LodSchemeId};
use crate::geometry::BoundingSphere;
use crate::ModelId;
use glam::Vec3;

const INTENSITY_EPSILON: f32 = 0.00001;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LodTier {
    High = 0,
    Medium = 1,
    Low = 2,
}

impl LodTier {
    /// One tier coarser, `Low` stays `Low`
    pub fn coarser(self) -> LodTier {
        match self {
            LodTier::High => LodTier::Medium,
            LodTier::Medium | LodTier::Low => LodTier::Low,
        }
    }
}

/// Picks the detail tier for an object seen from `camera_position`. `None` means the object is too
/// far away to be drawn at all.
pub fn select_model_tier(
    scheme: &LodModelScheme,
    camera_position: Vec3,
    bounds: &BoundingSphere,
) -> Option<LodTier> {
    let distance_squared = camera_position.distance_squared(bounds.position);
    let r = bounds.radius;

    let within = |range: f32| {
        let l = range + r;
        distance_squared < l * l
    };

    if within(scheme.high_range) {
        Some(LodTier::High)
    } else if within(scheme.medium_range) {
        Some(LodTier::Medium)
    } else if within(scheme.low_range) {
        Some(LodTier::Low)
    } else {
        None
    }
}

/// Same bands as `select_model_tier`, one tier coarser each
pub fn select_shadow_tier(
    scheme: &LodModelScheme,
    camera_position: Vec3,
    bounds: &BoundingSphere,
) -> Option<LodTier> {
    select_model_tier(scheme, camera_position, bounds).map(LodTier::coarser)
}

/// Intensity multiplier of a light, full inside `vis_range + radius` and fading linearly to zero
/// over `fade_range` beyond it. `None` once the light has faded out.
pub fn light_intensity(
    scheme: &LodLightScheme,
    camera_position: Vec3,
    bounds: &BoundingSphere,
    fade_range: f32,
) -> Option<f32> {
    let distance_squared = camera_position.distance_squared(bounds.position);
    let l = scheme.vis_range + bounds.radius;
    if distance_squared < l * l {
        return Some(1.);
    }

    if fade_range <= 0. {
        return None;
    }

    let distance = distance_squared.sqrt().clamp(l, l + fade_range);
    let intensity = 1. - (distance - l) / fade_range;
    if intensity > INTENSITY_EPSILON {
        Some(intensity)
    } else {
        None
    }
}

/// Up to three models of decreasing detail for one object. Missing tiers fall back to the next
/// finer model that exists.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LodModel {
    pub scheme: LodSchemeId,
    high: ModelId,
    medium: Option<ModelId>,
    low: Option<ModelId>,
}

impl LodModel {
    pub fn new(
        scheme: LodSchemeId,
        high: ModelId,
        medium: Option<ModelId>,
        low: Option<ModelId>,
    ) -> Self {
        LodModel {
            scheme,
            high,
            medium,
            low,
        }
    }

    pub fn model(
        &self,
        tier: LodTier,
    ) -> ModelId {
        match tier {
            LodTier::High => self.high,
            LodTier::Medium => self.medium.unwrap_or(self.high),
            LodTier::Low => self.low.or(self.medium).unwrap_or(self.high),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scheme() -> LodModelScheme {
        LodModelScheme {
            name: "test".to_string(),
            high_range: 10.,
            medium_range: 30.,
            low_range: 80.,
        }
    }

    fn at_distance(distance: f32) -> (Vec3, BoundingSphere) {
        (
            Vec3::new(0., 0., distance),
            BoundingSphere::new(Vec3::ZERO, 2.),
        )
    }

    #[test]
    fn test_model_bands_include_radius() {
        let scheme = scheme();
        let cases = [
            (5., Some(LodTier::High)),
            (11.9, Some(LodTier::High)),
            (12., Some(LodTier::Medium)),
            (31., Some(LodTier::Medium)),
            (60., Some(LodTier::Low)),
            (82., None),
        ];
        for (distance, expected) in cases {
            let (camera, bounds) = at_distance(distance);
            assert_eq!(select_model_tier(&scheme, camera, &bounds), expected);
        }
    }

    #[test]
    fn test_tier_never_refines_with_distance() {
        let scheme = scheme();
        let rank = |tier: Option<LodTier>| tier.map_or(3, |tier| tier as u32);

        let mut previous = 0;
        for step in 0..200 {
            let (camera, bounds) = at_distance(step as f32 * 0.5);
            let current = rank(select_model_tier(&scheme, camera, &bounds));
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_shadow_tier_is_one_coarser() {
        let scheme = scheme();
        let cases = [
            (5., Some(LodTier::Medium)),
            (20., Some(LodTier::Low)),
            (60., Some(LodTier::Low)),
            (100., None),
        ];
        for (distance, expected) in cases {
            let (camera, bounds) = at_distance(distance);
            assert_eq!(select_shadow_tier(&scheme, camera, &bounds), expected);
        }
    }

    #[test]
    fn test_light_fades_out() {
        let scheme = LodLightScheme {
            name: "test".to_string(),
            vis_range: 20.,
        };
        let bounds = BoundingSphere::new(Vec3::ZERO, 1.);

        assert_eq!(light_intensity(&scheme, Vec3::new(0., 0., 15.), &bounds, 5.), Some(1.));
        let halfway = light_intensity(&scheme, Vec3::new(0., 0., 23.5), &bounds, 5.).unwrap();
        assert_relative_eq!(halfway, 0.5, epsilon = 0.0001);
        assert_eq!(light_intensity(&scheme, Vec3::new(0., 0., 26.), &bounds, 5.), None);
        assert_eq!(light_intensity(&scheme, Vec3::new(0., 0., 22.), &bounds, 0.), None);
    }

    #[test]
    fn test_missing_tiers_fall_back() {
        let scheme = LodSchemeId::from_index(0);
        let only_high = LodModel::new(scheme, ModelId(1), None, None);
        assert_eq!(only_high.model(LodTier::Low), ModelId(1));

        let no_low = LodModel::new(scheme, ModelId(1), Some(ModelId(2)), None);
        assert_eq!(no_low.model(LodTier::Medium), ModelId(2));
        assert_eq!(no_low.model(LodTier::Low), ModelId(2));

        let full = LodModel::new(scheme, ModelId(1), Some(ModelId(2)), Some(ModelId(3)));
        assert_eq!(full.model(LodTier::Low), ModelId(3));
    }
}
