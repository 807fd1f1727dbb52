//! Per-category constant table with field names resolved to field ids

use std::collections::BTreeMap;

use crate::core::config::{CategoryParams, GuidanceMode, NeuriteParams};
use crate::core::error::{MosaicError, Result};
use crate::core::types::{CategoryId, FieldId};
use crate::simulation::fate::FateCandidate;
use crate::spatial::field::FieldRegistry;

#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub params: CategoryParams,
    pub marker: FieldId,
}

/// Guidance field(s) a dendrite reads at its tip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceFields {
    Single(FieldId),
    /// Competitive choice between the ON and OFF sublamina
    Competing { on: FieldId, off: FieldId },
}

#[derive(Debug, Clone)]
pub struct CategoryTable {
    rows: BTreeMap<CategoryId, CategoryRow>,
    on_field: FieldId,
    off_field: FieldId,
    fate: Vec<FateCandidate>,
}

impl CategoryTable {
    pub fn build(
        categories: &[CategoryParams],
        neurite: &NeuriteParams,
        fields: &FieldRegistry,
    ) -> Result<Self> {
        let mut rows = BTreeMap::new();
        let mut fate = Vec::new();
        for params in categories {
            let marker = fields.id(&params.marker_field)?;
            if let Some(weight) = params.fate_weight {
                fate.push(FateCandidate {
                    field: marker,
                    category: params.id,
                    weight,
                });
            }
            if rows
                .insert(params.id, CategoryRow { params: params.clone(), marker })
                .is_some()
            {
                return Err(MosaicError::InvalidConfig(format!(
                    "category {} listed twice",
                    params.id
                )));
            }
        }

        Ok(Self {
            rows,
            on_field: fields.id(&neurite.on_field)?,
            off_field: fields.id(&neurite.off_field)?,
            fate,
        })
    }

    pub fn get(&self, id: CategoryId) -> Result<&CategoryRow> {
        self.rows.get(&id).ok_or(MosaicError::UnknownCategory(id))
    }

    pub fn fate_candidates(&self) -> &[FateCandidate] {
        &self.fate
    }

    pub fn guidance(&self, mode: GuidanceMode) -> GuidanceFields {
        match mode {
            GuidanceMode::On => GuidanceFields::Single(self.on_field),
            GuidanceMode::Off => GuidanceFields::Single(self.off_field),
            GuidanceMode::OnOff => GuidanceFields::Competing {
                on: self.on_field,
                off: self.off_field,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;

    #[test]
    fn test_build_from_default_config() {
        let config = SimulationConfig::default();
        let fields = FieldRegistry::from_config(&config.fields, &config.domain).expect("fields");
        let table = CategoryTable::build(&config.categories, &config.neurite, &fields)
            .expect("table");

        for cat in &config.categories {
            assert!(table.get(cat.id).is_ok(), "category {} missing", cat.id);
        }
        assert_eq!(table.fate_candidates().len(), 4);
        let row = table.get(CategoryId(203)).expect("row");
        assert_eq!(row.marker, fields.id("off_j").expect("off_j"));
        assert!(matches!(
            table.get(CategoryId(999)),
            Err(MosaicError::UnknownCategory(CategoryId(999)))
        ));
    }

    #[test]
    fn test_on_off_guidance_is_competing() {
        let config = SimulationConfig::default();
        let fields = FieldRegistry::from_config(&config.fields, &config.domain).expect("fields");
        let table = CategoryTable::build(&config.categories, &config.neurite, &fields)
            .expect("table");
        assert!(matches!(
            table.guidance(GuidanceMode::OnOff),
            GuidanceFields::Competing { .. }
        ));
        assert_eq!(
            table.guidance(GuidanceMode::On),
            GuidanceFields::Single(fields.id("on_diffu").expect("on"))
        );
    }
}
