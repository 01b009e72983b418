//! Length measurements over page layout features
//!
//! Each measurement is a rectangle drawn over a layout feature (ascenders,
//! margins, line spacing, ...). Horizontal features are read from the
//! rectangle's **height** and vertical features from its **width**: a
//! horizontal band such as the interlinear space is measured across its
//! thickness, which runs vertically on the page.

use crate::geometry::{Point, Rect};
use crate::page_store::PageStore;
use crate::palette::Color;
use crate::stats::{mean, mode, population_std_dev, Mode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which rectangle dimension a measurement kind reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    /// Value is the rectangle height
    Horizontal,
    /// Value is the rectangle width
    Vertical,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

/// Layout feature being measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasurementKind {
    Ascenders,
    Descenders,
    Interlinear,
    UpperMargin,
    LowerMargin,
    LineHeight,
    MinimumHeight,
    InternalMargin,
    IntercolumnSpaces,
}

impl MeasurementKind {
    /// Every kind, horizontal ones first
    pub const ALL: [MeasurementKind; 9] = [
        MeasurementKind::Ascenders,
        MeasurementKind::Descenders,
        MeasurementKind::Interlinear,
        MeasurementKind::UpperMargin,
        MeasurementKind::LowerMargin,
        MeasurementKind::LineHeight,
        MeasurementKind::MinimumHeight,
        MeasurementKind::InternalMargin,
        MeasurementKind::IntercolumnSpaces,
    ];

    pub fn orientation(self) -> Orientation {
        match self {
            MeasurementKind::InternalMargin | MeasurementKind::IntercolumnSpaces => {
                Orientation::Vertical
            }
            _ => Orientation::Horizontal,
        }
    }

    pub fn with_orientation(orientation: Orientation) -> impl Iterator<Item = MeasurementKind> {
        Self::ALL.into_iter().filter(move |kind| kind.orientation() == orientation)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementKind::Ascenders => "ascenders",
            MeasurementKind::Descenders => "descenders",
            MeasurementKind::Interlinear => "interlinear",
            MeasurementKind::UpperMargin => "upperMargin",
            MeasurementKind::LowerMargin => "lowerMargin",
            MeasurementKind::LineHeight => "lineHeight",
            MeasurementKind::MinimumHeight => "minimumHeight",
            MeasurementKind::InternalMargin => "internalMargin",
            MeasurementKind::IntercolumnSpaces => "intercolumnSpaces",
        }
    }

    pub fn default_color(self) -> Color {
        match self {
            MeasurementKind::Ascenders => Color::rgba(0, 255, 0, 0.5),
            MeasurementKind::Descenders => Color::rgba(0, 0, 255, 0.5),
            MeasurementKind::Interlinear => Color::rgba(255, 165, 0, 0.5),
            MeasurementKind::UpperMargin => Color::rgba(255, 0, 0, 0.5),
            MeasurementKind::LowerMargin => Color::rgba(128, 0, 128, 0.5),
            MeasurementKind::InternalMargin => Color::rgba(0, 255, 255, 0.5),
            MeasurementKind::IntercolumnSpaces => Color::rgba(255, 0, 255, 0.5),
            MeasurementKind::LineHeight => Color::rgba(100, 100, 255, 0.5),
            MeasurementKind::MinimumHeight => Color::rgba(255, 100, 100, 0.5),
        }
    }

    /// The measured value of `rect` for this kind
    pub fn value_of(self, rect: &Rect) -> f64 {
        match self.orientation() {
            Orientation::Horizontal => rect.height,
            Orientation::Vertical => rect.width,
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown measurement kind: {0}")]
pub struct UnknownMeasurementKind(String);

impl FromStr for MeasurementKind {
    type Err = UnknownMeasurementKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownMeasurementKind(s.to_owned()))
    }
}

/// A measurement rectangle as stored on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthRect {
    #[serde(flatten)]
    pub rect: Rect,
    pub color: Color,
    pub label: MeasurementKind,
    pub id: String,
}

impl LengthRect {
    pub fn value(&self) -> f64 {
        self.label.value_of(&self.rect)
    }
}

/// Summary statistics for one measurement kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementStats {
    pub count: usize,
    pub average: f64,
    pub standard_deviation: f64,
    pub mode: Mode,
}

impl MeasurementStats {
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            count: values.iter().filter(|v| !v.is_nan()).count(),
            average: mean(values),
            standard_deviation: population_std_dev(values),
            mode: mode(values),
        }
    }
}

fn new_measurement_id() -> String {
    format!("len_{}", uuid::Uuid::new_v4().simple())
}

/// All length measurements of a document, per kind and page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthMeasurements {
    #[serde(default = "default_colors")]
    colors: BTreeMap<MeasurementKind, Color>,
    #[serde(default = "default_selected")]
    selected: MeasurementKind,
    #[serde(default)]
    label_positions: BTreeMap<String, Point>,
    #[serde(default)]
    measurements: BTreeMap<MeasurementKind, PageStore<LengthRect>>,
}

fn default_colors() -> BTreeMap<MeasurementKind, Color> {
    MeasurementKind::ALL.into_iter().map(|k| (k, k.default_color())).collect()
}

fn default_selected() -> MeasurementKind {
    MeasurementKind::Ascenders
}

impl Default for LengthMeasurements {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            selected: default_selected(),
            label_positions: BTreeMap::new(),
            measurements: BTreeMap::new(),
        }
    }
}

impl LengthMeasurements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the default colors with `overrides` applied
    pub fn with_colors(overrides: &BTreeMap<MeasurementKind, Color>) -> Self {
        let mut lengths = Self::default();
        lengths.colors.extend(overrides.iter().map(|(kind, color)| (*kind, *color)));
        lengths
    }

    pub fn color(&self, kind: MeasurementKind) -> Color {
        self.colors.get(&kind).copied().unwrap_or_else(|| kind.default_color())
    }

    /// Change the color used for future measurements of `kind`
    pub fn set_color(&mut self, kind: MeasurementKind, color: Color) {
        self.colors.insert(kind, color);
    }

    pub fn colors(&self) -> &BTreeMap<MeasurementKind, Color> {
        &self.colors
    }

    pub fn selected(&self) -> MeasurementKind {
        self.selected
    }

    pub fn select(&mut self, kind: MeasurementKind) {
        self.selected = kind;
    }

    /// Record a rectangle for `kind` on `page`, returning its new id
    pub fn add_measurement(&mut self, kind: MeasurementKind, page: usize, rect: Rect) -> String {
        let id = new_measurement_id();
        let entry = LengthRect { rect, color: self.color(kind), label: kind, id: id.clone() };
        self.measurements.entry(kind).or_default().append(page, entry, 0);
        id
    }

    pub fn measurements(&self, kind: MeasurementKind, page: usize) -> &[LengthRect] {
        self.measurements.get(&kind).map(|store| store.page(page)).unwrap_or(&[])
    }

    /// Whether any measurement exists on `page`
    pub fn has_page_content(&self, page: usize) -> bool {
        self.measurements.values().any(|store| !store.page(page).is_empty())
    }

    pub fn set_label_position(&mut self, id: impl Into<String>, position: Point) {
        self.label_positions.insert(id.into(), position);
    }

    pub fn label_position(&self, id: &str) -> Option<Point> {
        self.label_positions.get(id).copied()
    }

    /// Clear every kind of one orientation on `page`
    pub fn clear_orientation(&mut self, page: usize, orientation: Orientation) {
        for kind in MeasurementKind::with_orientation(orientation) {
            self.clear_kind(kind, page);
        }
    }

    /// Clear every kind on `page`
    pub fn clear_all(&mut self, page: usize) {
        for kind in MeasurementKind::ALL {
            self.clear_kind(kind, page);
        }
    }

    fn clear_kind(&mut self, kind: MeasurementKind, page: usize) {
        let Some(store) = self.measurements.get_mut(&kind) else {
            return;
        };
        for removed in store.page(page) {
            self.label_positions.remove(&removed.id);
        }
        store.clear(page);
    }

    fn values(&self, kind: MeasurementKind, page: usize) -> Vec<f64> {
        self.measurements(kind, page).iter().map(LengthRect::value).collect()
    }

    pub fn stats_for_kind(&self, kind: MeasurementKind, page: usize) -> MeasurementStats {
        MeasurementStats::from_values(&self.values(kind, page))
    }

    /// Stats for each kind with at least one measurement on `page`
    pub fn stats_for_page(&self, page: usize) -> BTreeMap<MeasurementKind, MeasurementStats> {
        MeasurementKind::ALL
            .into_iter()
            .filter(|kind| !self.measurements(*kind, page).is_empty())
            .map(|kind| (kind, self.stats_for_kind(kind, page)))
            .collect()
    }

    /// Stats for every kind over the pooled values of pages `0..total_pages`.
    ///
    /// Values are concatenated in page order before computing, so pages with
    /// more measurements weigh more. This is not an average of page stats.
    pub fn stats_for_document(
        &self,
        total_pages: usize,
    ) -> BTreeMap<MeasurementKind, MeasurementStats> {
        MeasurementKind::ALL
            .into_iter()
            .map(|kind| {
                let values: Vec<f64> =
                    (0..total_pages).flat_map(|page| self.values(kind, page)).collect();
                (kind, MeasurementStats::from_values(&values))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(height: f64) -> Rect {
        Rect::new(10.0, 10.0, 300.0, height)
    }

    #[test]
    fn test_orientation_classes() {
        let vertical: Vec<_> = MeasurementKind::with_orientation(Orientation::Vertical).collect();
        assert_eq!(
            vertical,
            vec![MeasurementKind::InternalMargin, MeasurementKind::IntercolumnSpaces]
        );
        assert_eq!(MeasurementKind::with_orientation(Orientation::Horizontal).count(), 7);
    }

    #[test]
    fn test_horizontal_reads_height_vertical_reads_width() {
        let rect = Rect::new(0.0, 0.0, 40.0, 12.0);
        assert_eq!(MeasurementKind::Descenders.value_of(&rect), 12.0);
        assert_eq!(MeasurementKind::IntercolumnSpaces.value_of(&rect), 40.0);
    }

    #[test]
    fn test_add_measurement_tags_color_label_and_unique_id() {
        let mut lengths = LengthMeasurements::new();
        let first = lengths.add_measurement(MeasurementKind::Interlinear, 2, band(8.0));
        let second = lengths.add_measurement(MeasurementKind::Interlinear, 2, band(9.0));

        assert_ne!(first, second);
        assert!(first.starts_with("len_"));

        let stored = lengths.measurements(MeasurementKind::Interlinear, 2);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].label, MeasurementKind::Interlinear);
        assert_eq!(stored[0].color, Color::rgba(255, 165, 0, 0.5));
        assert_eq!(stored[1].id, second);
    }

    #[test]
    fn test_color_changes_apply_to_new_measurements_only() {
        let mut lengths = LengthMeasurements::new();
        lengths.add_measurement(MeasurementKind::Ascenders, 0, band(5.0));
        lengths.set_color(MeasurementKind::Ascenders, Color::rgb(1, 2, 3));
        lengths.add_measurement(MeasurementKind::Ascenders, 0, band(6.0));

        let stored = lengths.measurements(MeasurementKind::Ascenders, 0);
        assert_eq!(stored[0].color, MeasurementKind::Ascenders.default_color());
        assert_eq!(stored[1].color, Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_stats_for_kind_empty() {
        let lengths = LengthMeasurements::new();
        let stats = lengths.stats_for_kind(MeasurementKind::LineHeight, 0);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average, 0.0);
        assert_eq!(stats.standard_deviation, 0.0);
        assert_eq!(stats.mode, Mode::NoMode);
    }

    #[test]
    fn test_stats_for_page_skips_empty_kinds() {
        let mut lengths = LengthMeasurements::new();
        lengths.add_measurement(MeasurementKind::UpperMargin, 0, band(30.0));
        lengths.add_measurement(MeasurementKind::UpperMargin, 0, band(30.0));
        lengths.add_measurement(MeasurementKind::InternalMargin, 1, Rect::new(0.0, 0.0, 14.0, 900.0));

        let page0 = lengths.stats_for_page(0);
        assert_eq!(page0.len(), 1);
        let upper = &page0[&MeasurementKind::UpperMargin];
        assert_eq!(upper.average, 30.0);
        assert_eq!(upper.mode, Mode::Value(30.0));

        let page1 = lengths.stats_for_page(1);
        assert_eq!(page1[&MeasurementKind::InternalMargin].average, 14.0);
    }

    #[test]
    fn test_document_stats_pool_values_across_pages() {
        let mut lengths = LengthMeasurements::new();
        lengths.add_measurement(MeasurementKind::Ascenders, 0, band(2.0));
        lengths.add_measurement(MeasurementKind::Ascenders, 0, band(4.0));
        lengths.add_measurement(MeasurementKind::Ascenders, 1, band(6.0));

        let stats = lengths.stats_for_document(2);
        let ascenders = &stats[&MeasurementKind::Ascenders];

        // mean([2, 4, 6]), not mean(mean([2, 4]), mean([6])) = 4.5
        assert_eq!(ascenders.average, 4.0);
        assert_eq!(ascenders.count, 3);
        assert_eq!(stats.len(), MeasurementKind::ALL.len());
        assert_eq!(stats[&MeasurementKind::Descenders].count, 0);
    }

    #[test]
    fn test_document_stats_respect_page_range() {
        let mut lengths = LengthMeasurements::new();
        lengths.add_measurement(MeasurementKind::Ascenders, 0, band(2.0));
        lengths.add_measurement(MeasurementKind::Ascenders, 3, band(100.0));

        let stats = lengths.stats_for_document(2);
        assert_eq!(stats[&MeasurementKind::Ascenders].average, 2.0);
    }

    #[test]
    fn test_clear_orientation_leaves_other_class() {
        let mut lengths = LengthMeasurements::new();
        let id = lengths.add_measurement(MeasurementKind::Descenders, 0, band(3.0));
        lengths.set_label_position(&id, Point::new(1.0, 1.0));
        lengths.add_measurement(MeasurementKind::IntercolumnSpaces, 0, band(3.0));
        lengths.add_measurement(MeasurementKind::Descenders, 1, band(3.0));

        lengths.clear_orientation(0, Orientation::Horizontal);

        assert!(lengths.measurements(MeasurementKind::Descenders, 0).is_empty());
        assert_eq!(lengths.label_position(&id), None);
        assert_eq!(lengths.measurements(MeasurementKind::IntercolumnSpaces, 0).len(), 1);
        assert_eq!(lengths.measurements(MeasurementKind::Descenders, 1).len(), 1);

        lengths.clear_all(0);
        assert!(!lengths.has_page_content(0));
        assert!(lengths.has_page_content(1));
    }

    #[test]
    fn test_kind_parses_from_label() {
        assert_eq!("lineHeight".parse::<MeasurementKind>().unwrap(), MeasurementKind::LineHeight);
        assert!("baseline".parse::<MeasurementKind>().is_err());
    }

    #[test]
    fn test_saved_measurements_without_colors_load_with_defaults() {
        let mut lengths = LengthMeasurements::new();
        lengths.set_color(MeasurementKind::Ascenders, Color::rgba(1, 2, 3, 1.0));
        lengths.select(MeasurementKind::LineHeight);
        lengths.add_measurement(MeasurementKind::LineHeight, 0, band(14.0));

        let mut value = serde_json::to_value(&lengths).unwrap();
        let object = value.as_object_mut().unwrap();
        object.remove("colors");
        object.remove("selected");

        let loaded: LengthMeasurements = serde_json::from_value(value).unwrap();
        assert_eq!(loaded.colors(), LengthMeasurements::new().colors());
        assert_eq!(loaded.selected(), MeasurementKind::Ascenders);
        assert_eq!(loaded.measurements(MeasurementKind::LineHeight, 0).len(), 1);
    }
}
