//! Device sink: the host-side widgets mirroring each mower

pub mod publisher;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::RwLock;

/// Widgets published for every mower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    State,
    Run,
    Battery,
    Actions,
    Location,
    CuttingHeight,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 6] = [
        WidgetKind::State,
        WidgetKind::Run,
        WidgetKind::Battery,
        WidgetKind::Actions,
        WidgetKind::Location,
        WidgetKind::CuttingHeight,
    ];

    /// Display label of the widget
    pub fn label(&self) -> &'static str {
        match self {
            WidgetKind::State => "State",
            WidgetKind::Run => "Run",
            WidgetKind::Battery => "Battery Level",
            WidgetKind::Actions => "Actions",
            WidgetKind::Location => "Location",
            WidgetKind::CuttingHeight => "Cutting Height (cm)",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Numeric and textual value of a widget
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetValue {
    pub n_value: i64,
    pub s_value: String,
}

impl WidgetValue {
    pub fn new(n_value: i64, s_value: impl Into<String>) -> Self {
        Self {
            n_value,
            s_value: s_value.into(),
        }
    }

    /// Switch value (on = 1)
    pub fn switch(on: bool) -> Self {
        let n = i64::from(on);
        Self::new(n, n.to_string())
    }

    /// Selector level; the level is carried in the text value
    pub fn level(level: u32) -> Self {
        Self::new(2, level.to_string())
    }
}

/// Icon set of a widget
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WidgetImage {
    #[default]
    Standard,
    Inverse,
    Off,
}

/// Presentation attributes sent along with a value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayAttrs {
    pub image: WidgetImage,

    pub battery_level: Option<u8>,

    /// Push the value even when it did not change
    pub always_update: bool,

    /// Selector labels, `|`-separated
    pub level_names: Option<String>,
}

/// Widgets to flag as timed out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnreachableTarget {
    Device(String),
    All,
}

/// Host-side collaborator receiving mower snapshots
pub trait DeviceSink: Send + Sync {
    /// Create or update one widget of a mower
    fn upsert_device_widget(&self, name: &str, kind: WidgetKind, value: WidgetValue, attrs: DisplayAttrs);

    /// Flag widgets as unreachable until their next update
    fn mark_unreachable(&self, target: UnreachableTarget);

    /// Value currently displayed by a widget, if it exists
    fn read_last_displayed_value(&self, name: &str, kind: WidgetKind) -> Option<WidgetValue>;
}

/// A widget as held by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    pub value: WidgetValue,
    pub attrs: DisplayAttrs,
    pub timed_out: bool,
}

/// In-memory sink
#[derive(Debug, Default)]
pub struct MemorySink {
    widgets: RwLock<HashMap<(String, WidgetKind), Widget>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn widget(&self, name: &str, kind: WidgetKind) -> Option<Widget> {
        let widgets = self.widgets.read().unwrap_or_else(|e| e.into_inner());
        widgets.get(&(name.to_string(), kind)).cloned()
    }

    /// Names of the devices holding at least one widget
    pub fn device_names(&self) -> Vec<String> {
        let widgets = self.widgets.read().unwrap_or_else(|e| e.into_inner());
        let names: HashSet<&String> = widgets.keys().map(|(name, _)| name).collect();
        let mut names: Vec<String> = names.into_iter().cloned().collect();
        names.sort();
        names
    }

    pub fn is_timed_out(&self, name: &str, kind: WidgetKind) -> bool {
        self.widget(name, kind).is_some_and(|w| w.timed_out)
    }
}

impl DeviceSink for MemorySink {
    fn upsert_device_widget(&self, name: &str, kind: WidgetKind, value: WidgetValue, attrs: DisplayAttrs) {
        let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());
        widgets.insert(
            (name.to_string(), kind),
            Widget {
                value,
                attrs,
                timed_out: false,
            },
        );
    }

    fn mark_unreachable(&self, target: UnreachableTarget) {
        let mut widgets = self.widgets.write().unwrap_or_else(|e| e.into_inner());
        for ((name, _), widget) in widgets.iter_mut() {
            let matches = match &target {
                UnreachableTarget::All => true,
                UnreachableTarget::Device(device) => device == name,
            };
            if matches {
                widget.timed_out = true;
            }
        }
    }

    fn read_last_displayed_value(&self, name: &str, kind: WidgetKind) -> Option<WidgetValue> {
        self.widget(name, kind).map(|w| w.value)
    }
}
