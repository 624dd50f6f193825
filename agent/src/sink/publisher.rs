//! Mapping of mower snapshots onto the sink widgets

use tracing::debug;

use crate::models::mower::{Location, Mower, MowerActivity};
use crate::sink::{DeviceSink, DisplayAttrs, WidgetImage, WidgetKind, WidgetValue};
use crate::storage::mower_config::{CuttingRange, Zone};
use crate::utils::haversine_km;

/// Zone name used when no zone can be resolved
pub const UNKNOWN_ZONE: &str = "Unknown";

/// Labels of the actions selector; level N*10 selects the N-th label
pub const ACTION_LEVEL_NAMES: &str =
    "|Start (6h)|Pause|Resume Schedule|Park Until Further Notice|Park Until Next Schedule";

/// Push one mower snapshot to the sink
pub fn publish_mower(sink: &dyn DeviceSink, mower: &Mower, zones: &[Zone], cutting_range: &CuttingRange) {
    let name = mower.name.as_str();
    let image = if mower.is_off() {
        WidgetImage::Off
    } else {
        WidgetImage::Standard
    };
    let battery = mower.battery_pct.unwrap_or(0);
    let attrs = DisplayAttrs {
        image,
        ..Default::default()
    };

    sink.upsert_device_widget(
        name,
        WidgetKind::State,
        WidgetValue::new(0, format_state_text(mower)),
        attrs.clone(),
    );

    sink.upsert_device_widget(
        name,
        WidgetKind::Run,
        WidgetValue::switch(mower.activity.is_running()),
        DisplayAttrs {
            battery_level: Some(battery),
            ..attrs.clone()
        },
    );

    sink.upsert_device_widget(
        name,
        WidgetKind::Battery,
        WidgetValue::new(i64::from(battery), battery.to_string()),
        attrs.clone(),
    );

    let zone = nearest_zone(mower.location, zones);
    sink.upsert_device_widget(name, WidgetKind::Location, WidgetValue::new(0, zone), attrs.clone());

    if let Some(step) = mower.cutting_height.filter(|step| *step > 0) {
        sink.upsert_device_widget(
            name,
            WidgetKind::CuttingHeight,
            WidgetValue::level(cutting_level_from_step(step)),
            DisplayAttrs {
                level_names: Some(cutting_range.level_names()),
                ..attrs.clone()
            },
        );
    }

    sink.upsert_device_widget(
        name,
        WidgetKind::Actions,
        WidgetValue::level(0),
        DisplayAttrs {
            image: if mower.is_off() {
                WidgetImage::Off
            } else {
                WidgetImage::Inverse
            },
            always_update: true,
            level_names: Some(ACTION_LEVEL_NAMES.to_string()),
            ..Default::default()
        },
    );

    debug!(mower = %name, "Widgets updated");
}

/// State text: `STATE: ACTIVITY`, plus the error description on its own line
pub fn format_state_text(mower: &Mower) -> String {
    let mut text = if mower.activity == MowerActivity::NotApplicable {
        mower.state.to_string()
    } else {
        format!("{}: {}", mower.state, mower.activity)
    };

    if let Some(error) = mower.error_state.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        text.push('\n');
        text.push_str(error);
    }
    text
}

/// Name of the zone closest to `location`
pub fn nearest_zone(location: Option<Location>, zones: &[Zone]) -> String {
    let Some(location) = location else {
        return UNKNOWN_ZONE.to_string();
    };

    zones
        .iter()
        .map(|zone| {
            let distance = haversine_km(
                (location.latitude, location.longitude),
                (zone.latitude, zone.longitude),
            );
            (zone, distance)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(zone, _)| zone.name.clone())
        .unwrap_or_else(|| UNKNOWN_ZONE.to_string())
}

/// Selector level of a 1-based cutting height step
pub fn cutting_level_from_step(step: u8) -> u32 {
    10 * (u32::from(step).saturating_sub(1))
}

/// 1-based cutting height step of a selector level
pub fn step_from_cutting_level(level: u32) -> u8 {
    u8::try_from(level / 10 + 1).unwrap_or(u8::MAX)
}
