use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Axis of a split node: a vertical split puts its children side by side,
/// a horizontal split stacks them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SplitType {
    Horizontal,
    #[default]
    Vertical,
}

impl SplitType {
    pub fn toggled(self) -> SplitType {
        match self {
            SplitType::Horizontal => SplitType::Vertical,
            SplitType::Vertical => SplitType::Horizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SplitMode {
    #[default]
    Automatic,
    Manual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    North,
    West,
    South,
    East,
}

impl Direction {
    /// The split type a preselection in this direction produces.
    pub fn split_type(self) -> SplitType {
        match self {
            Direction::West | Direction::East => SplitType::Vertical,
            Direction::North | Direction::South => SplitType::Horizontal,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::West => Direction::East,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
        }
    }

    /// Whether a node inserted in this direction becomes the first child.
    pub fn is_leading(self) -> bool { matches!(self, Direction::North | Direction::West) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Flip {
    Horizontal,
    Vertical,
}

impl Flip {
    pub fn split_type(self) -> SplitType {
        match self {
            Flip::Horizontal => SplitType::Horizontal,
            Flip::Vertical => SplitType::Vertical,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn from_degrees(deg: i32) -> Option<Rotation> {
        match deg.rem_euclid(360) {
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Whether this rotation swaps the children of a node split along `split`.
    pub fn crosses(self, split: SplitType) -> bool {
        match self {
            Rotation::Deg90 => split == SplitType::Horizontal,
            Rotation::Deg180 => true,
            Rotation::Deg270 => split == SplitType::Vertical,
        }
    }

    pub fn toggles_split(self) -> bool { self.degrees() > 180 }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(deg: u16) -> Result<Self, Self::Error> {
        Rotation::from_degrees(deg as i32).ok_or_else(|| format!("invalid rotation: {deg}"))
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> u16 { r.degrees() }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CycleDir {
    Next,
    Prev,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HistoryDir {
    Older,
    Newer,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChildPolarity {
    FirstChild,
    #[default]
    SecondChild,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AutomaticScheme {
    #[default]
    LongestSide,
    Alternate,
    Spiral,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tightness {
    Low,
    #[default]
    High,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Layout {
    #[default]
    Tiled,
    Monocle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AreaPeak {
    Biggest,
    Smallest,
}
