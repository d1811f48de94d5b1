use leptos::prelude::*;

use crate::sim::LegendEntry;

fn css_rgb(entry: &LegendEntry) -> String {
	let (r, g, b) = entry.mood.palette().primary.channels();
	format!("rgb({}, {}, {})", r, g, b)
}

/// Mood shares of the graph currently on screen, largest first.
#[component]
pub fn MoodLegend(#[prop(into)] entries: Signal<Vec<LegendEntry>>) -> impl IntoView {
	view! {
		<div class="mood-legend">
			{move || {
				entries
					.get()
					.into_iter()
					.map(|entry| {
						let color = css_rgb(&entry);
						view! {
							<div class="legend-item">
								<span class="legend-text">{entry.mood.name()}</span>
								<span style=format!("color: {}", color)>
									{format!("{}%", entry.percent.round())}
								</span>
								<div
									class="legend-dot"
									style=format!(
										"background-color: {0}; box-shadow: 0 0 6px {0};",
										color,
									)
								></div>
							</div>
						}
					})
					.collect_view()
			}}
		</div>
	}
}
