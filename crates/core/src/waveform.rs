//! Named waveforms and the fixed-size batches pushed to the device each tick.

use std::collections::BTreeMap;
use std::path::Path;

use dglab_protocol::PulseOperation;

use crate::error::CatalogError;

/// Pulse units per repeat group in one batch.
pub const PULSE_GROUP_LEN: usize = 5;

/// Repeat groups per batch.
pub const PULSE_GROUP_REPEATS: usize = 5;

/// Pulse units in one batch (2.5s of output).
pub const PULSE_WINDOW: usize = PULSE_GROUP_LEN * PULSE_GROUP_REPEATS;

/// Waveform selected on both channels until `change` says otherwise.
pub const DEFAULT_WAVEFORM: &str = "呼吸";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
	pub name: String,
	pub pulses: Vec<PulseOperation>,
}

/// Read-only name → waveform mapping, in display order.
#[derive(Debug, Clone)]
pub struct WaveformCatalog {
	default: String,
	entries: Vec<Waveform>,
}

impl WaveformCatalog {
	/// Builds a catalog, checking every pulse byte.
	///
	/// The default is [`DEFAULT_WAVEFORM`] when present, otherwise the first entry.
	pub fn new(entries: Vec<Waveform>) -> Result<Self, CatalogError> {
		if entries.is_empty() {
			return Err(CatalogError::Empty);
		}
		for waveform in &entries {
			if waveform.pulses.is_empty() {
				return Err(CatalogError::EmptyWaveform(waveform.name.clone()));
			}
			for pulse in &waveform.pulses {
				pulse.validate().map_err(|source| CatalogError::InvalidPulse {
					name: waveform.name.clone(),
					source,
				})?;
			}
		}
		let default = entries
			.iter()
			.find(|w| w.name == DEFAULT_WAVEFORM)
			.unwrap_or(&entries[0])
			.name
			.clone();
		Ok(Self { default, entries })
	}

	/// The vendor app's sixteen preset waveforms.
	pub fn builtin() -> Self {
		let entries = presets()
			.into_iter()
			.map(|(name, pulses)| Waveform {
				name: name.to_string(),
				pulses,
			})
			.collect();
		Self {
			default: DEFAULT_WAVEFORM.to_string(),
			entries,
		}
	}

	/// Parses `{"name": [[[f,f,f,f],[s,s,s,s]], ...], ...}`.
	pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
		let map: BTreeMap<String, Vec<PulseOperation>> = serde_json::from_str(raw)?;
		Self::new(
			map.into_iter()
				.map(|(name, pulses)| Waveform { name, pulses })
				.collect(),
		)
	}

	pub fn load(path: &Path) -> Result<Self, CatalogError> {
		let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_json(&raw)
	}

	pub fn default_name(&self) -> &str {
		&self.default
	}

	pub fn get(&self, name: &str) -> Option<&Waveform> {
		self.entries.iter().find(|w| w.name == name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	pub fn names(&self) -> Vec<&str> {
		self.entries.iter().map(|w| w.name.as_str()).collect()
	}

	/// Batch for `name`, falling back to the default waveform for unknown names.
	pub fn batch(&self, name: &str) -> PulseBatch {
		let waveform = self
			.get(name)
			.or_else(|| self.get(&self.default))
			.unwrap_or(&self.entries[0]);
		PulseBatch::fill(waveform, PULSE_WINDOW)
	}
}

/// A waveform cycled to fill a fixed transmission window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulseBatch {
	waveform: String,
	pulses: Vec<PulseOperation>,
}

impl PulseBatch {
	pub fn fill(waveform: &Waveform, window: usize) -> Self {
		Self {
			waveform: waveform.name.clone(),
			pulses: waveform.pulses.iter().copied().cycle().take(window).collect(),
		}
	}

	pub fn waveform(&self) -> &str {
		&self.waveform
	}

	pub fn pulses(&self) -> &[PulseOperation] {
		&self.pulses
	}

	pub fn len(&self) -> usize {
		self.pulses.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pulses.is_empty()
	}
}

const fn p(frequency: [u8; 4], strength: [u8; 4]) -> PulseOperation {
	PulseOperation(frequency, strength)
}

const F10: [u8; 4] = [10, 10, 10, 10];
const SILENT: [u8; 4] = [0, 0, 0, 0];

fn presets() -> Vec<(&'static str, Vec<PulseOperation>)> {
	vec![
		(
			"呼吸",
			vec![
				p(F10, SILENT),
				p(F10, [0, 5, 10, 20]),
				p(F10, [20, 25, 30, 40]),
				p(F10, [40, 45, 50, 60]),
				p(F10, [60, 65, 70, 80]),
				p(F10, [100, 100, 100, 100]),
				p(F10, [100, 100, 100, 100]),
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, SILENT),
			],
		),
		(
			"潮汐",
			vec![
				p(F10, SILENT),
				p([10, 10, 10, 10], [0, 4, 8, 17]),
				p([10, 10, 10, 10], [17, 21, 25, 33]),
				p([15, 15, 15, 15], [50, 50, 50, 50]),
				p([15, 15, 15, 15], [50, 54, 58, 67]),
				p([20, 20, 20, 20], [67, 71, 75, 83]),
				p([20, 20, 20, 20], [100, 98, 96, 92]),
				p([15, 15, 15, 15], [92, 90, 88, 84]),
				p([15, 15, 15, 15], [84, 82, 80, 76]),
				p(F10, [68, 68, 68, 68]),
			],
		),
		(
			"连击",
			vec![
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, [100, 100, 100, 100]),
				p(F10, [100, 92, 84, 67]),
				p(F10, [67, 58, 50, 33]),
				p(F10, SILENT),
				p(F10, [0, 0, 0, 1]),
				p(F10, [2, 2, 2, 2]),
			],
		),
		(
			"快速按捏",
			vec![
				p(F10, SILENT),
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, [100, 100, 100, 100]),
			],
		),
		(
			"按捏渐强",
			vec![
				p(F10, SILENT),
				p(F10, [29, 29, 29, 29]),
				p(F10, SILENT),
				p(F10, [52, 52, 52, 52]),
				p(F10, [2, 2, 2, 2]),
				p(F10, [73, 73, 73, 73]),
				p(F10, SILENT),
				p(F10, [87, 87, 87, 87]),
				p(F10, SILENT),
				p(F10, [100, 100, 100, 100]),
			],
		),
		(
			"心跳节奏",
			vec![
				p([110, 110, 110, 110], [100, 100, 100, 100]),
				p([110, 110, 110, 110], [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, SILENT),
				p(F10, SILENT),
				p(F10, [75, 75, 75, 75]),
				p(F10, [75, 77, 79, 83]),
				p(F10, [83, 85, 88, 92]),
				p(F10, SILENT),
				p(F10, SILENT),
			],
		),
		(
			"压缩",
			vec![
				p([25, 25, 24, 24], [100, 100, 100, 100]),
				p([24, 23, 23, 23], [100, 100, 100, 100]),
				p([22, 22, 22, 21], [100, 100, 100, 100]),
				p([21, 21, 20, 20], [100, 100, 100, 100]),
				p([20, 19, 19, 19], [100, 100, 100, 100]),
				p([18, 18, 18, 17], [100, 100, 100, 100]),
				p([17, 16, 16, 16], [100, 100, 100, 100]),
				p([15, 15, 15, 14], [100, 100, 100, 100]),
				p([14, 14, 13, 13], [100, 100, 100, 100]),
				p([13, 12, 12, 12], [100, 100, 100, 100]),
				p([11, 11, 11, 10], [100, 100, 100, 100]),
				p(F10, [100, 100, 100, 100]),
			],
		),
		(
			"节奏步伐",
			vec![
				p(F10, SILENT),
				p(F10, [0, 5, 10, 20]),
				p(F10, [20, 25, 30, 40]),
				p(F10, [40, 45, 50, 60]),
				p(F10, [60, 65, 70, 80]),
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, [0, 6, 12, 25]),
				p(F10, [25, 31, 38, 50]),
				p(F10, [50, 56, 62, 75]),
				p(F10, [100, 100, 100, 100]),
			],
		),
		(
			"颗粒摩擦",
			vec![
				p(F10, [100, 100, 100, 100]),
				p(F10, [100, 100, 100, 100]),
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
			],
		),
		(
			"渐变弹跳",
			vec![
				p(F10, [1, 1, 1, 1]),
				p(F10, [1, 9, 18, 34]),
				p(F10, [34, 42, 50, 67]),
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, SILENT),
			],
		),
		(
			"波浪涟漪",
			vec![
				p(F10, SILENT),
				p(F10, [0, 12, 25, 50]),
				p(F10, [50, 62, 75, 100]),
				p([73, 73, 73, 73], [100, 100, 100, 100]),
			],
		),
		(
			"雨水冲刷",
			vec![
				p([34, 34, 34, 34], [0, 12, 25, 50]),
				p([34, 34, 34, 34], [50, 62, 75, 100]),
				p([34, 34, 34, 34], [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, SILENT),
			],
		),
		(
			"变速敲击",
			vec![
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
				p([110, 110, 110, 110], [100, 100, 100, 100]),
				p([110, 110, 110, 110], [100, 100, 100, 100]),
				p([110, 110, 110, 110], [100, 100, 100, 100]),
				p([110, 110, 110, 110], [100, 100, 100, 100]),
			],
		),
		(
			"信号灯",
			vec![
				p([197, 197, 197, 197], [100, 100, 100, 100]),
				p([197, 197, 197, 197], [100, 100, 100, 100]),
				p([197, 197, 197, 197], [100, 100, 100, 100]),
				p([197, 197, 197, 197], [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, [0, 25, 50, 75]),
				p(F10, [100, 100, 100, 100]),
			],
		),
		(
			"挑逗1",
			vec![
				p(F10, SILENT),
				p(F10, [0, 6, 12, 25]),
				p(F10, [25, 31, 38, 50]),
				p(F10, [50, 56, 62, 75]),
				p(F10, [75, 81, 88, 100]),
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
				p(F10, SILENT),
				p(F10, SILENT),
				p([210, 210, 210, 210], [100, 100, 100, 100]),
			],
		),
		(
			"挑逗2",
			vec![
				p(F10, [1, 1, 1, 1]),
				p(F10, [1, 4, 6, 12]),
				p(F10, [12, 15, 18, 23]),
				p(F10, [23, 26, 28, 34]),
				p(F10, [34, 37, 40, 45]),
				p(F10, [45, 48, 50, 56]),
				p(F10, [56, 59, 62, 67]),
				p(F10, [67, 70, 72, 78]),
				p(F10, [78, 81, 84, 89]),
				p(F10, [100, 100, 100, 100]),
				p(F10, SILENT),
			],
		),
	]
}
