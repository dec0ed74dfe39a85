//! # Hyperparameters
//!
//! Concrete parameter values (`ParamValue`), one configuration (`ParamSet`) and
//! search spaces (`ParamGrid`) that expand into the candidates a grid search tries.

use crate::error::ModelError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value.
///
/// Config files map onto it directly: `8 -> Int`, `0.1 -> Float`, `true -> Bool`,
/// `"distance" -> Str`, and the string `"none"` -> `None`. Only the exact
/// lowercase `"none"` is reserved; `"None"` stays a string. Binary formats use a
/// tagged encoding instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Stands for "unset", e.g. an unlimited `max_depth`.
    None,
}

/// One concrete configuration: parameter name -> value.
pub type ParamSet = BTreeMap<String, ParamValue>;

impl ParamValue {
    pub fn as_f64(&self, name: &str) -> Result<f64, ModelError> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(ModelError::invalid_param(name, format!("expected a number, got {other}"))),
        }
    }

    pub fn as_usize(&self, name: &str) -> Result<usize, ModelError> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            other => Err(ModelError::invalid_param(
                name,
                format!("expected a non-negative integer, got {other}"),
            )),
        }
    }

    /// Like [`ParamValue::as_usize`] but `None` maps to `Option::None`.
    pub fn as_opt_usize(&self, name: &str) -> Result<Option<usize>, ModelError> {
        match self {
            ParamValue::None => Ok(None),
            other => other.as_usize(name).map(Some),
        }
    }

    /// A non-negative integer as `u64`, with `None` mapping to `Option::None`.
    pub fn as_opt_u64(&self, name: &str) -> Result<Option<u64>, ModelError> {
        match self {
            ParamValue::None => Ok(None),
            ParamValue::Int(v) if *v >= 0 => Ok(Some(*v as u64)),
            other => Err(ModelError::invalid_param(
                name,
                format!("expected a non-negative integer or none, got {other}"),
            )),
        }
    }

    pub fn as_bool(&self, name: &str) -> Result<bool, ModelError> {
        match self {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(ModelError::invalid_param(name, format!("expected a boolean, got {other}"))),
        }
    }

    pub fn as_str(&self, name: &str) -> Result<&str, ModelError> {
        match self {
            ParamValue::Str(v) => Ok(v),
            other => Err(ModelError::invalid_param(name, format!("expected a string, got {other}"))),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "'{v}'"),
            ParamValue::None => f.write_str("None"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::None, Into::into)
    }
}

const VARIANTS: &[&str] = &["Bool", "Int", "Float", "Str", "None"];

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return match self {
                ParamValue::Bool(v) => serializer.serialize_newtype_variant("ParamValue", 0, VARIANTS[0], v),
                ParamValue::Int(v) => serializer.serialize_newtype_variant("ParamValue", 1, VARIANTS[1], v),
                ParamValue::Float(v) => serializer.serialize_newtype_variant("ParamValue", 2, VARIANTS[2], v),
                ParamValue::Str(v) => serializer.serialize_newtype_variant("ParamValue", 3, VARIANTS[3], v),
                ParamValue::None => serializer.serialize_unit_variant("ParamValue", 4, VARIANTS[4]),
            };
        }
        match self {
            ParamValue::Bool(v) => serializer.serialize_bool(*v),
            ParamValue::Int(v) => serializer.serialize_i64(*v),
            ParamValue::Float(v) => serializer.serialize_f64(*v),
            ParamValue::Str(v) => serializer.serialize_str(v),
            ParamValue::None => serializer.serialize_str("none"),
        }
    }
}

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if !deserializer.is_human_readable() {
            return TaggedValue::deserialize(deserializer).map(Into::into);
        }
        deserializer.deserialize_any(ParamValueVisitor)
    }
}

/// Binary layout of [`ParamValue`]; mirrors the variant order written by `serialize`.
#[derive(Deserialize)]
#[serde(rename = "ParamValue")]
enum TaggedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    None,
}

impl From<TaggedValue> for ParamValue {
    fn from(value: TaggedValue) -> Self {
        match value {
            TaggedValue::Bool(v) => ParamValue::Bool(v),
            TaggedValue::Int(v) => ParamValue::Int(v),
            TaggedValue::Float(v) => ParamValue::Float(v),
            TaggedValue::Str(v) => ParamValue::Str(v),
            TaggedValue::None => ParamValue::None,
        }
    }
}

struct ParamValueVisitor;

impl<'de> Visitor<'de> for ParamValueVisitor {
    type Value = ParamValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean, number, string or \"none\"")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ParamValue, E> {
        Ok(ParamValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ParamValue, E> {
        Ok(ParamValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ParamValue, E> {
        i64::try_from(v)
            .map(ParamValue::Int)
            .map_err(|_| E::custom(format!("integer {v} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ParamValue, E> {
        Ok(ParamValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ParamValue, E> {
        if v == "none" {
            Ok(ParamValue::None)
        } else {
            Ok(ParamValue::Str(v.to_string()))
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<ParamValue, E> {
        Ok(ParamValue::None)
    }

    fn visit_none<E: de::Error>(self) -> Result<ParamValue, E> {
        Ok(ParamValue::None)
    }
}

// --- Search Space ---

type SubGrid = BTreeMap<String, Vec<ParamValue>>;

/// A hyperparameter search space.
///
/// Holds one or more sub-grids; each sub-grid maps a parameter name to the values
/// to try. Candidates are the cartesian product of each sub-grid, sub-grids
/// concatenated in order.
///
/// Text formats accept either a single table or an array of tables; binary
/// formats always store the list of sub-grids.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    subgrids: Vec<SubGrid>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GridRepr {
    Single(SubGrid),
    Many(Vec<SubGrid>),
}

impl From<GridRepr> for ParamGrid {
    fn from(repr: GridRepr) -> Self {
        match repr {
            GridRepr::Single(grid) => ParamGrid { subgrids: vec![grid] },
            GridRepr::Many(subgrids) => ParamGrid { subgrids },
        }
    }
}

impl Serialize for ParamGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.subgrids.as_slice() {
            [single] if serializer.is_human_readable() => single.serialize(serializer),
            subgrids => subgrids.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ParamGrid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            GridRepr::deserialize(deserializer).map(Into::into)
        } else {
            Vec::<SubGrid>::deserialize(deserializer).map(|subgrids| ParamGrid { subgrids })
        }
    }
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamGrid {
    /// An empty search space: a single candidate that changes nothing.
    pub fn new() -> Self {
        ParamGrid {
            subgrids: vec![SubGrid::new()],
        }
    }

    /// Adds (or replaces) a parameter axis on the last sub-grid.
    pub fn with<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        if let Some(last) = self.subgrids.last_mut() {
            last.insert(name.into(), values);
        }
        self
    }

    /// Appends another grid's sub-grids, so candidates from both are tried.
    pub fn or(mut self, other: ParamGrid) -> Self {
        self.subgrids.extend(other.subgrids);
        self
    }

    /// Number of candidates without expanding them.
    pub fn len(&self) -> usize {
        self.subgrids
            .iter()
            .map(|g| g.values().map(Vec::len).product::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expands the grid into concrete candidates.
    ///
    /// Keys are iterated in sorted order with the last key varying fastest.
    /// A parameter with no values is rejected.
    pub fn candidates(&self) -> Result<Vec<ParamSet>, ModelError> {
        let mut out = Vec::with_capacity(self.len());
        for grid in &self.subgrids {
            if let Some((name, _)) = grid.iter().find(|(_, values)| values.is_empty()) {
                return Err(ModelError::invalid_param(
                    name.clone(),
                    "parameter grid values must be a non-empty sequence",
                ));
            }

            let mut configs = vec![ParamSet::new()];
            for (name, values) in grid {
                let mut next = Vec::with_capacity(configs.len() * values.len());
                for config in &configs {
                    for value in values {
                        let mut c = config.clone();
                        c.insert(name.clone(), value.clone());
                        next.push(c);
                    }
                }
                configs = next;
            }
            out.extend(configs);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_grid_yields_single_empty_candidate() {
        let grid = ParamGrid::new();
        assert_eq!(grid.candidates().unwrap(), vec![ParamSet::new()]);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn last_sorted_key_varies_fastest() {
        let grid = ParamGrid::new()
            .with("b", [1_i64, 2])
            .with("a", [true, false]);
        let got: Vec<(bool, i64)> = grid
            .candidates()
            .unwrap()
            .iter()
            .map(|c| (c["a"].as_bool("a").unwrap(), c["b"].as_usize("b").unwrap() as i64))
            .collect();
        assert_eq!(got, vec![(true, 1), (true, 2), (false, 1), (false, 2)]);
    }

    #[test]
    fn subgrids_are_concatenated() {
        let grid = ParamGrid::new()
            .with("alpha", [0.1, 1.0])
            .or(ParamGrid::new().with("fit_intercept", [false]));
        assert_eq!(grid.len(), 3);
        let candidates = grid.candidates().unwrap();
        assert_eq!(candidates.len(), 3);
        assert!(candidates[2].contains_key("fit_intercept"));
    }

    #[test]
    fn empty_axis_is_rejected() {
        let grid = ParamGrid::new().with("alpha", Vec::<f64>::new());
        assert!(matches!(grid.candidates(), Err(ModelError::InvalidParam { .. })));
    }

    #[test]
    fn grid_deserializes_from_table_or_array() {
        let single: ParamGrid = toml::from_str("n_neighbors = [3, 5]\nweights = [\"uniform\"]").unwrap();
        assert_eq!(single.len(), 2);

        #[derive(Deserialize)]
        struct Wrapper {
            grid: ParamGrid,
        }
        let many: Wrapper =
            toml::from_str("[[grid]]\nalpha = [0.5]\n\n[[grid]]\nmax_depth = [2, \"none\"]").unwrap();
        let candidates = many.grid.candidates().unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[2]["max_depth"], ParamValue::None);
    }

    #[test]
    fn accessors_check_types() {
        assert_eq!(ParamValue::Int(3).as_f64("x").unwrap(), 3.0);
        assert!(ParamValue::Float(0.5).as_usize("x").is_err());
        assert!(ParamValue::Int(-1).as_usize("x").is_err());
        assert_eq!(ParamValue::None.as_opt_usize("x").unwrap(), None);
        assert_eq!(ParamValue::from(Some(4_usize)), ParamValue::Int(4));
    }

    #[test]
    fn only_lowercase_none_is_reserved() {
        #[derive(Deserialize)]
        struct Wrapper {
            lower: ParamValue,
            title: ParamValue,
        }
        let parsed: Wrapper = toml::from_str("lower = \"none\"\ntitle = \"None\"").unwrap();
        assert_eq!(parsed.lower, ParamValue::None);
        assert_eq!(parsed.title, ParamValue::Str("None".to_string()));
    }

    #[test]
    fn oversized_integers_saturate() {
        assert_eq!(ParamValue::from(u64::MAX), ParamValue::Int(i64::MAX));
        assert_eq!(ParamValue::from(usize::MAX), ParamValue::Int(i64::MAX));
        assert_eq!(ParamValue::Int(7).as_opt_u64("seed").unwrap(), Some(7));
        assert!(ParamValue::Int(-7).as_opt_u64("seed").is_err());
    }

    #[test]
    fn binary_encoding_keeps_variants_apart() {
        let set = ParamSet::from([
            ("alpha".to_string(), ParamValue::Float(0.1)),
            ("max_depth".to_string(), ParamValue::None),
            ("name".to_string(), ParamValue::Str("none".to_string())),
            ("n".to_string(), ParamValue::Int(3)),
            ("flag".to_string(), ParamValue::Bool(true)),
        ]);
        let bytes = bincode::serialize(&set).unwrap();
        let back: ParamSet = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, set);

        let grid = ParamGrid::new()
            .with("alpha", [0.1, 1.0])
            .or(ParamGrid::new().with("max_depth", [Some(2_usize), None]));
        let bytes = bincode::serialize(&grid).unwrap();
        assert_eq!(bincode::deserialize::<ParamGrid>(&bytes).unwrap(), grid);
    }
}
