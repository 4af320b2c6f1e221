use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Change of a metric between the reference period (P2) and the current one (P1).
///
/// Renderers match on the variant. On the wire a `Value` is a plain JSON number
/// and every other variant is one of the strings `"New"`, `"Lost"`,
/// `"Infinity"`, `"-Infinity"` or `"N/A"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    Value(f64),
    /// No reference data: the entity (or its ranking) appeared in P1.
    New,
    /// The entity had a ranking in P2 and has none in P1.
    Lost,
    /// Growth from a zero reference.
    Infinity,
    /// Decline from a zero reference.
    NegInfinity,
    /// An operand was missing altogether.
    NotAvailable,
}

impl Delta {
    pub const fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::Value(_) => None,
            Self::New => Some("New"),
            Self::Lost => Some("Lost"),
            Self::Infinity => Some("Infinity"),
            Self::NegInfinity => Some("-Infinity"),
            Self::NotAvailable => Some("N/A"),
        }
    }

    /// Numeric value, if this is not a sentinel.
    pub const fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// Renderer-facing class of this delta for a metric of the given polarity.
    pub fn trend(&self, polarity: Polarity) -> Trend {
        let direction = match self {
            Self::Value(v) if *v > 0.0 => 1,
            Self::Value(v) if *v < 0.0 => -1,
            Self::Infinity => 1,
            Self::NegInfinity => -1,
            Self::New => return Trend::New,
            Self::Lost => return Trend::Lost,
            Self::Value(_) | Self::NotAvailable => return Trend::Neutral,
        };
        let improving = match polarity {
            Polarity::HigherIsBetter => direction > 0,
            Polarity::LowerIsBetter => direction < 0,
        };
        if improving {
            Trend::Positive
        } else {
            Trend::Negative
        }
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            sentinel => f.write_str(sentinel.as_str().unwrap_or_default()),
        }
    }
}

impl Serialize for Delta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            sentinel => serializer.serialize_str(sentinel.as_str().unwrap_or_default()),
        }
    }
}

impl<'de> Deserialize<'de> for Delta {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DeltaVisitor;

        impl Visitor<'_> for DeltaVisitor {
            type Value = Delta;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or one of New, Lost, Infinity, -Infinity, N/A")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Delta, E> {
                Ok(Delta::Value(v))
            }

            #[allow(clippy::cast_precision_loss)]
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Delta, E> {
                Ok(Delta::Value(v as f64))
            }

            #[allow(clippy::cast_precision_loss)]
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Delta, E> {
                Ok(Delta::Value(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Delta, E> {
                match v {
                    "New" => Ok(Delta::New),
                    "Lost" => Ok(Delta::Lost),
                    "Infinity" => Ok(Delta::Infinity),
                    "-Infinity" => Ok(Delta::NegInfinity),
                    "N/A" => Ok(Delta::NotAvailable),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(DeltaVisitor)
    }
}

/// Whether an increase of the metric is good news.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Clicks, impressions, CTR.
    HigherIsBetter,
    /// Rank: a smaller position number is an improvement.
    LowerIsBetter,
}

/// Display class a renderer attaches to a delta cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Positive,
    Negative,
    Neutral,
    New,
    Lost,
}

/// Relative change of `p1` against `p2`, in percent.
///
/// A zero reference yields `Infinity` / `-Infinity` depending on the sign of
/// `p1`, or `0` when both are zero. A missing operand yields `N/A`.
pub fn delta_pct(p1: Option<f64>, p2: Option<f64>) -> Delta {
    let (Some(p1), Some(p2)) = (p1, p2) else {
        return Delta::NotAvailable;
    };
    if p2 == 0.0 {
        return if p1 > 0.0 {
            Delta::Infinity
        } else if p1 < 0.0 {
            Delta::NegInfinity
        } else {
            Delta::Value(0.0)
        };
    }
    Delta::Value(((p1 / p2) - 1.0) * 100.0)
}

/// Absolute CTR change in percentage points. Inputs are 0..1 fractions.
pub fn delta_ctr_points(ctr_p1: f64, ctr_p2: f64) -> Delta {
    Delta::Value((ctr_p1 - ctr_p2) * 100.0)
}

/// Absolute rank change, `rank_p1 - rank_p2`. Negative means the entity moved up.
///
/// `had_reference` tells whether a P2 period exists at all; when neither
/// period is ranked the entity counts as lost only if it has history.
pub fn delta_rank(rank_p1: Option<f64>, rank_p2: Option<f64>, had_reference: bool) -> Delta {
    match (rank_p1, rank_p2) {
        (Some(p1), Some(p2)) => Delta::Value(p1 - p2),
        (Some(_), None) => Delta::New,
        (None, Some(_)) => Delta::Lost,
        (None, None) if had_reference => Delta::Lost,
        (None, None) => Delta::New,
    }
}
