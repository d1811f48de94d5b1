use leptos::prelude::*;

/// 404 Not Found Page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="not-found">
			<h1>"SIGNAL LOST"</h1>
			<p>"Nothing flocks here. "<a href="/">"Return to the swarm."</a></p>
		</div>
	}
}
