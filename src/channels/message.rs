use crate::channels::Notice;
use crate::core::models::{InventoryItem, ItemFeatures};

const CURRENCY_SUFFIX: &str = "₺";

pub fn title(notice: Notice) -> &'static str {
    if notice.is_repeat {
        "🔄 BACK IN STOCK"
    } else {
        "🆕 NEW VEHICLE"
    }
}

/// Plain-text message body shared by every channel.
pub fn render(item: &InventoryItem, notice: Notice) -> String {
    let mut text = format!(
        "{}\n\n📱 Model: {}\n💰 Price: {}\n🔢 VIN: {}",
        title(notice),
        item.trim_name,
        format_price(&item.price),
        item.vin
    );

    if notice.is_repeat {
        text.push_str(&format!("\n📊 Notification #{}", notice.ordinal));
    }

    let features = feature_lines(&item.features);
    if !features.is_empty() {
        text.push_str("\n\n🔧 Features:\n");
        text.push_str(&features.join("\n"));
    }

    text
}

fn feature_lines(features: &ItemFeatures) -> Vec<String> {
    [
        ("🔋 Range", &features.range),
        ("⚡ 0-100 km/h", &features.acceleration),
        ("🏎️ Top speed", &features.top_speed),
        ("🎨 Paint", &features.paint),
        ("⚙️ Wheels", &features.wheels),
        ("🪑 Interior", &features.interior),
        ("👥 Seats", &features.seats),
        ("🤖 Autopilot", &features.autopilot),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{label}: {v}")))
    .collect()
}

/// Formats a raw price as whole units with `.` thousand separators,
/// e.g. `"2499000.50"` becomes `"2.499.001 ₺"`.
pub fn format_price(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            format!("{} {CURRENCY_SUFFIX}", group_thousands(value.round() as u64))
        }
        _ => {
            tracing::warn!(price = %raw, "Could not format price");
            format!("{raw} {CURRENCY_SUFFIX}")
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
