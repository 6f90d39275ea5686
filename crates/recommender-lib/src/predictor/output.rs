//! Prediction output decoding
//!
//! Maps the categorical codes emitted by the classifiers back to the
//! human-readable labels they were trained on. Decoding never fails: an
//! unknown code, or a missing decoder, yields the code's decimal string.

use crate::models::Recommendation;
use serde::{Deserialize, Serialize};

/// Label decoder fitted at training time: code `i` decodes to `classes[i]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelDecoder {
    classes: Vec<String>,
}

impl LabelDecoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn try_decode(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
    }

    pub fn decode(&self, code: i64) -> String {
        self.try_decode(code)
            .map(str::to_string)
            .unwrap_or_else(|| code.to_string())
    }
}

/// Decode with an optional decoder, falling back to the stringified code
pub fn decode_label(decoder: Option<&LabelDecoder>, code: i64) -> String {
    match decoder {
        Some(decoder) => decoder.decode(code),
        None => code.to_string(),
    }
}

/// Raw classifier codes for one inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionCodes {
    pub compute: i64,
    pub storage: i64,
    pub scaling: i64,
}

/// The three decoders of a model bundle, any of which may be absent
#[derive(Debug, Clone, Default)]
pub struct OutputDecoders {
    pub compute: Option<LabelDecoder>,
    pub storage: Option<LabelDecoder>,
    pub scaling: Option<LabelDecoder>,
}

impl OutputDecoders {
    pub fn decode(&self, codes: PredictionCodes) -> Recommendation {
        Recommendation {
            compute_class: decode_label(self.compute.as_ref(), codes.compute),
            storage_class: decode_label(self.storage.as_ref(), codes.storage),
            scaling_action: decode_label(self.scaling.as_ref(), codes.scaling),
        }
    }
}
