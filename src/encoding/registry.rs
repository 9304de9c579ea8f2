use std::collections::BTreeMap;

use crate::errors::RegistryError;

use super::decode::DecodeStrategy;
use super::features::InputConfig;
use super::targets::TargetStrategy;

/// Named preprocessing variants, built once at startup.
#[derive(Debug, Clone)]
pub struct Registry {
    inputs: BTreeMap<&'static str, InputConfig>,
    targets: BTreeMap<&'static str, TargetStrategy>,
    decoders: BTreeMap<&'static str, DecodeStrategy>,
}

impl Registry {
    pub fn standard() -> Self {
        let inputs = [InputConfig::inputs_v0(), InputConfig::inputs_v1()]
            .into_iter()
            .map(|config| (config.name, config))
            .collect();
        let targets = [TargetStrategy::EdgeButtons, TargetStrategy::SparseButtons]
            .into_iter()
            .map(|strategy| (strategy.name(), strategy))
            .collect();
        let decoders = BTreeMap::from([
            (
                "preds_v0",
                DecodeStrategy::Sample {
                    temperature: DecodeStrategy::DEFAULT_TEMPERATURE,
                },
            ),
            ("preds_v1", DecodeStrategy::Argmax),
        ]);

        Self {
            inputs,
            targets,
            decoders,
        }
    }

    pub fn input_config(&self, name: &str) -> Result<&InputConfig, RegistryError> {
        lookup(&self.inputs, "Input config", name)
    }

    pub fn target_strategy(&self, name: &str) -> Result<TargetStrategy, RegistryError> {
        lookup(&self.targets, "Target strategy", name).copied()
    }

    pub fn decoder(&self, name: &str) -> Result<DecodeStrategy, RegistryError> {
        lookup(&self.decoders, "Decoder", name).copied()
    }
}

fn lookup<'a, T>(
    table: &'a BTreeMap<&'static str, T>,
    kind: &'static str,
    name: &str,
) -> Result<&'a T, RegistryError> {
    table.get(name).ok_or_else(|| RegistryError::Unknown {
        kind,
        name: name.to_string(),
        valid: table.keys().map(|key| key.to_string()).collect(),
    })
}
