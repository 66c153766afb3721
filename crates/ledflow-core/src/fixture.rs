//! Fixture map: static routing from sACN addressing to output pixel positions
//!
//! Built once from validated configuration and immutable for the process
//! lifetime. Strip declaration order is the physical wiring order; each
//! `(output, position)` pair pins a fixed offset into that output's pixel
//! buffer.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pixel::{PixelKind, DMX_UNIVERSE_SIZE, UNIVERSE_MAX};

/// Maximum number of physical output lines
pub const MAX_OUTPUTS: usize = 4;

/// Identity of a physical output line (1 of 4)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputId {
    /// First output line
    Out1,
    /// Second output line
    Out2,
    /// Third output line
    Out3,
    /// Fourth output line
    Out4,
}

impl OutputId {
    /// All output identities, in order
    pub const ALL: [OutputId; MAX_OUTPUTS] =
        [OutputId::Out1, OutputId::Out2, OutputId::Out3, OutputId::Out4];

    /// Zero-based index, stable across the process lifetime
    pub const fn index(self) -> usize {
        match self {
            OutputId::Out1 => 0,
            OutputId::Out2 => 1,
            OutputId::Out3 => 2,
            OutputId::Out4 => 3,
        }
    }
}

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "out{}", self.index() + 1)
    }
}

/// Validated BCM GPIO pin id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GpioPin(u8);

impl GpioPin {
    /// Lowest pin id an output may use
    pub const MIN: u8 = 1;
    /// Highest pin id an output may use
    pub const MAX: u8 = 27;

    /// Validate a raw BCM pin number
    pub fn new(pin: u8) -> Result<Self, FixtureMapError> {
        if (Self::MIN..=Self::MAX).contains(&pin) {
            Ok(Self(pin))
        } else {
            Err(FixtureMapError::InvalidGpio(pin))
        }
    }

    /// Raw BCM pin number
    pub const fn bcm(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for GpioPin {
    type Error = FixtureMapError;

    fn try_from(pin: u8) -> Result<Self, Self::Error> {
        Self::new(pin)
    }
}

impl From<GpioPin> for u8 {
    fn from(pin: GpioPin) -> u8 {
        pin.0
    }
}

impl std::fmt::Display for GpioPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gpio{}", self.0)
    }
}

/// One physically chained run of pixels bound to a channel range within a
/// single universe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strip {
    /// Globally unique strip label
    pub label: String,
    /// Number of chained pixels
    pub pixel_count: u16,
    /// Source sACN universe
    pub universe: u16,
    /// First DMX channel (1-512)
    pub start_channel: u16,
    /// Pixel encoding
    pub kind: PixelKind,
}

impl Strip {
    /// DMX channels covered by this strip
    pub fn channel_span(&self) -> u32 {
        u32::from(self.pixel_count) * self.kind.channel_span() as u32
    }

    /// Last DMX channel covered by this strip
    pub fn end_channel(&self) -> u32 {
        u32::from(self.start_channel) + self.channel_span() - 1
    }

    /// Bytes this strip contributes to its output buffer
    pub fn byte_len(&self) -> usize {
        self.channel_span() as usize
    }

    fn validate(&self) -> Result<(), FixtureMapError> {
        if self.pixel_count == 0 {
            return Err(FixtureMapError::EmptyStrip {
                label: self.label.clone(),
            });
        }
        if self.universe == 0 || self.universe > UNIVERSE_MAX {
            return Err(FixtureMapError::InvalidUniverse {
                label: self.label.clone(),
                universe: self.universe,
            });
        }
        if self.start_channel == 0 || self.start_channel as usize > DMX_UNIVERSE_SIZE {
            return Err(FixtureMapError::InvalidStartChannel {
                label: self.label.clone(),
                start_channel: self.start_channel,
            });
        }
        if self.end_channel() as usize > DMX_UNIVERSE_SIZE {
            return Err(FixtureMapError::UniverseOverflow {
                label: self.label.clone(),
                end_channel: self.end_channel(),
            });
        }
        Ok(())
    }
}

/// One physical output line and its ordered strip chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Output identity
    pub id: OutputId,
    /// GPIO pin carrying the signal
    pub gpio: GpioPin,
    /// Pixel encoding shared by every strip on the line
    pub kind: PixelKind,
    /// Strips in wiring order
    pub strips: Vec<Strip>,
}

impl OutputLine {
    /// Total pixels chained on this line
    pub fn pixel_count(&self) -> usize {
        self.strips
            .iter()
            .map(|s| usize::from(s.pixel_count))
            .sum()
    }

    /// Size of the assembled pixel buffer in bytes
    pub fn buffer_len(&self) -> usize {
        self.pixel_count() * self.kind.channel_span()
    }
}

/// Fixture configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FixtureMapError {
    /// No outputs declared at all
    #[error("no outputs declared")]
    Empty,
    /// The same output id appeared twice
    #[error("output [{0}] declared more than once")]
    DuplicateOutput(OutputId),
    /// An output has no strips
    #[error("output [{0}] has no strips")]
    NoStrips(OutputId),
    /// A GPIO pin is shared between outputs
    #[error("pin [{0}] used on multiple outputs")]
    DuplicateGpio(GpioPin),
    /// A pin id outside the allowed range
    #[error("invalid gpio pin [{0}]")]
    InvalidGpio(u8),
    /// A strip label is not globally unique
    #[error("strip [{0}]: label used on multiple strips")]
    DuplicateLabel(String),
    /// A strip with zero pixels
    #[error("strip [{label}]: pixel count must be at least 1")]
    EmptyStrip {
        /// Offending strip
        label: String,
    },
    /// A universe id outside 1-63999
    #[error("strip [{label}]: invalid universe [{universe}]")]
    InvalidUniverse {
        /// Offending strip
        label: String,
        /// Declared universe
        universe: u16,
    },
    /// A start channel outside 1-512
    #[error("strip [{label}]: invalid start channel [{start_channel}]")]
    InvalidStartChannel {
        /// Offending strip
        label: String,
        /// Declared start channel
        start_channel: u16,
    },
    /// A strip crossing the universe boundary
    #[error("strip [{label}] does not fit in a single DMX universe (ends at channel {end_channel})")]
    UniverseOverflow {
        /// Offending strip
        label: String,
        /// Where the strip would end
        end_channel: u32,
    },
}

/// Static routing table for all outputs, validated at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureMap {
    outputs: Vec<OutputLine>,
    universes: BTreeSet<u16>,
}

impl FixtureMap {
    /// Validate and freeze a set of output lines.
    ///
    /// Checks: at least one output, no duplicate output ids or pins, at
    /// least one strip per output, globally unique labels, and every strip
    /// inside universe/channel bounds.
    pub fn new(mut outputs: Vec<OutputLine>) -> Result<Self, FixtureMapError> {
        if outputs.is_empty() {
            return Err(FixtureMapError::Empty);
        }
        outputs.sort_by_key(|line| line.id);

        let mut seen_ids = BTreeSet::new();
        let mut seen_pins = BTreeSet::new();
        let mut seen_labels = BTreeSet::new();
        let mut universes = BTreeSet::new();

        for line in &outputs {
            if !seen_ids.insert(line.id) {
                return Err(FixtureMapError::DuplicateOutput(line.id));
            }
            if !seen_pins.insert(line.gpio.bcm()) {
                return Err(FixtureMapError::DuplicateGpio(line.gpio));
            }
            if line.strips.is_empty() {
                return Err(FixtureMapError::NoStrips(line.id));
            }
            for strip in &line.strips {
                strip.validate()?;
                if !seen_labels.insert(strip.label.clone()) {
                    return Err(FixtureMapError::DuplicateLabel(strip.label.clone()));
                }
                universes.insert(strip.universe);
            }
        }

        Ok(Self { outputs, universes })
    }

    /// Output lines, ordered by id
    pub fn outputs(&self) -> &[OutputLine] {
        &self.outputs
    }

    /// Look up one output line
    pub fn output(&self, id: OutputId) -> Option<&OutputLine> {
        self.outputs.iter().find(|line| line.id == id)
    }

    /// Every universe referenced by at least one strip
    pub fn universes(&self) -> impl Iterator<Item = u16> + '_ {
        self.universes.iter().copied()
    }

    /// Whether any strip sources from `universe`
    pub fn contains_universe(&self, universe: u16) -> bool {
        self.universes.contains(&universe)
    }

    /// Total pixel count across all outputs
    pub fn total_pixels(&self) -> usize {
        self.outputs.iter().map(OutputLine::pixel_count).sum()
    }
}
