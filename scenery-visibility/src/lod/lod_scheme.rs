use crate::{SceneResult, VisibilityError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

pub const DEFAULT_SCHEME_NAME: &str = "default";

const MIN_HIGH_RANGE: f32 = 1.;
const MIN_MEDIUM_RANGE: f32 = 2.;
const MIN_LOW_RANGE: f32 = 3.;
const MIN_VIS_RANGE: f32 = 1.;

/// 1-based index of a scheme within its registry list
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LodSchemeId(NonZeroU32);

impl LodSchemeId {
    pub(crate) fn from_index(index: usize) -> Self {
        LodSchemeId(NonZeroU32::new(index as u32 + 1).unwrap_or(NonZeroU32::MIN))
    }

    fn index(self) -> usize {
        self.0.get() as usize - 1
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

fn min_high_range() -> f32 {
    MIN_HIGH_RANGE
}

fn min_medium_range() -> f32 {
    MIN_MEDIUM_RANGE
}

fn min_low_range() -> f32 {
    MIN_LOW_RANGE
}

fn min_vis_range() -> f32 {
    MIN_VIS_RANGE
}

/// Distance bands of a model. Each band extends the object's bounding radius, so `high_range` is
/// measured from the surface of the bounds rather than their center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodModelScheme {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "high-range", default = "min_high_range")]
    pub high_range: f32,
    #[serde(rename = "medium-range", default = "min_medium_range")]
    pub medium_range: f32,
    #[serde(rename = "low-range", default = "min_low_range")]
    pub low_range: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodLightScheme {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "vis-range", default = "min_vis_range")]
    pub vis_range: f32,
}

#[derive(Default, Serialize, Deserialize)]
struct LodSchemeDocument {
    #[serde(default)]
    model: Vec<LodModelScheme>,
    #[serde(default)]
    light: Vec<LodLightScheme>,
}

/// Named distance thresholds for models and lights, looked up by name once and by id afterwards.
pub struct LodSchemeRegistry {
    model_schemes: Vec<LodModelScheme>,
    model_lookup: FxHashMap<String, LodSchemeId>,
    light_schemes: Vec<LodLightScheme>,
    light_lookup: FxHashMap<String, LodSchemeId>,
}

impl Default for LodSchemeRegistry {
    fn default() -> Self {
        let model = LodModelScheme {
            name: DEFAULT_SCHEME_NAME.to_string(),
            high_range: 30.,
            medium_range: 90.,
            low_range: 250.,
        };
        let light = LodLightScheme {
            name: DEFAULT_SCHEME_NAME.to_string(),
            vis_range: 100.,
        };

        let mut model_lookup = FxHashMap::default();
        model_lookup.insert(model.name.clone(), LodSchemeId::from_index(0));
        let mut light_lookup = FxHashMap::default();
        light_lookup.insert(light.name.clone(), LodSchemeId::from_index(0));

        LodSchemeRegistry {
            model_schemes: vec![model],
            model_lookup,
            light_schemes: vec![light],
            light_lookup,
        }
    }
}

impl LodSchemeRegistry {
    /// Ranges below their minimum are raised to it. Both lists need at least one entry and a scheme
    /// named "default".
    pub fn new(
        mut model_schemes: Vec<LodModelScheme>,
        mut light_schemes: Vec<LodLightScheme>,
    ) -> SceneResult<Self> {
        if model_schemes.is_empty() {
            return Err(VisibilityError::InvalidLodSchemes(
                "at least one model scheme must exist".to_string(),
            ));
        }
        if !model_schemes
            .iter()
            .any(|scheme| scheme.name == DEFAULT_SCHEME_NAME)
        {
            return Err(VisibilityError::InvalidLodSchemes(
                "model scheme 'default' does not exist".to_string(),
            ));
        }
        if light_schemes.is_empty() {
            return Err(VisibilityError::InvalidLodSchemes(
                "at least one light scheme must exist".to_string(),
            ));
        }
        if !light_schemes
            .iter()
            .any(|scheme| scheme.name == DEFAULT_SCHEME_NAME)
        {
            return Err(VisibilityError::InvalidLodSchemes(
                "light scheme 'default' does not exist".to_string(),
            ));
        }

        let mut model_lookup = FxHashMap::default();
        for (index, scheme) in model_schemes.iter_mut().enumerate() {
            scheme.high_range = scheme.high_range.max(MIN_HIGH_RANGE);
            scheme.medium_range = scheme.medium_range.max(MIN_MEDIUM_RANGE);
            scheme.low_range = scheme.low_range.max(MIN_LOW_RANGE);
            model_lookup.insert(scheme.name.clone(), LodSchemeId::from_index(index));
        }

        let mut light_lookup = FxHashMap::default();
        for (index, scheme) in light_schemes.iter_mut().enumerate() {
            scheme.vis_range = scheme.vis_range.max(MIN_VIS_RANGE);
            light_lookup.insert(scheme.name.clone(), LodSchemeId::from_index(index));
        }

        log::debug!(
            "Loaded {} model and {} light LOD schemes",
            model_schemes.len(),
            light_schemes.len()
        );

        Ok(LodSchemeRegistry {
            model_schemes,
            model_lookup,
            light_schemes,
            light_lookup,
        })
    }

    /// Parses `{ "model": [...], "light": [...] }`
    pub fn from_json(json: &str) -> SceneResult<Self> {
        let document: LodSchemeDocument = serde_json::from_str(json)?;
        Self::new(document.model, document.light)
    }

    pub fn find_model_scheme(
        &self,
        name: &str,
    ) -> Option<LodSchemeId> {
        self.model_lookup.get(name).copied()
    }

    pub fn find_light_scheme(
        &self,
        name: &str,
    ) -> Option<LodSchemeId> {
        self.light_lookup.get(name).copied()
    }

    /// Id of the "default" model scheme
    pub fn default_model_scheme(&self) -> Option<LodSchemeId> {
        self.find_model_scheme(DEFAULT_SCHEME_NAME)
    }

    pub fn default_light_scheme(&self) -> Option<LodSchemeId> {
        self.find_light_scheme(DEFAULT_SCHEME_NAME)
    }

    pub fn model_scheme(
        &self,
        id: LodSchemeId,
    ) -> Option<&LodModelScheme> {
        debug_assert!(id.index() < self.model_schemes.len());
        self.model_schemes.get(id.index())
    }

    pub fn light_scheme(
        &self,
        id: LodSchemeId,
    ) -> Option<&LodLightScheme> {
        debug_assert!(id.index() < self.light_schemes.len());
        self.light_schemes.get(id.index())
    }

    pub fn model_scheme_count(&self) -> usize {
        self.model_schemes.len()
    }

    pub fn light_scheme_count(&self) -> usize {
        self.light_schemes.len()
    }
}
