use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, TouchEvent, Window};

use super::render;
use super::state::{CanvasState, SceneController};
use crate::sim::{SceneConfig, SceneError};

fn window() -> Result<Window, SceneError> {
	web_sys::window().ok_or_else(|| SceneError::Js("no window".into()))
}

/// Logical size of the canvas' parent and the device pixel ratio.
fn measure(canvas: &HtmlCanvasElement) -> Result<(f64, f64, f64), SceneError> {
	let win = window()?;
	let dpr = win.device_pixel_ratio().max(1.0);
	let (w, h) = match canvas.parent_element() {
		Some(parent) => {
			let rect = parent.get_bounding_client_rect();
			(rect.width(), rect.height())
		}
		None => (
			win.inner_width()?.as_f64().unwrap_or(800.0),
			win.inner_height()?.as_f64().unwrap_or(600.0),
		),
	};
	Ok((w, h, dpr))
}

/// Back the canvas with `dpr` pixels per logical pixel.
fn fit(canvas: &HtmlCanvasElement, w: f64, h: f64, dpr: f64) -> Result<(), SceneError> {
	canvas.set_width((w * dpr) as u32);
	canvas.set_height((h * dpr) as u32);
	let style = web_sys::HtmlElement::style(canvas);
	style.set_property("width", &format!("{}px", w))?;
	style.set_property("height", &format!("{}px", h))?;
	Ok(())
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, SceneError> {
	canvas
		.get_context("2d")?
		.ok_or(SceneError::ContextUnavailable)?
		.dyn_into()
		.map_err(|_| SceneError::ContextUnavailable)
}

/// Full-bleed canvas animating the murmuration.
#[component]
pub fn FlockCanvas(
	controller: SceneController,
	#[prop(optional)] config: Option<SceneConfig>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<CanvasState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());
	let controller_init = controller.clone();

	let start = move |canvas: HtmlCanvasElement| -> Result<(), SceneError> {
		let win = window()?;
		let (w, h, dpr) = measure(&canvas)?;
		fit(&canvas, w, h, dpr)?;
		let ctx = context_2d(&canvas)?;

		let config = config.clone().unwrap_or_default();
		let seed = config.seed.unwrap_or_else(|| js_sys::Date::now() as u64);
		*state_init.borrow_mut() = Some(CanvasState::new(config, w, h, dpr, seed));
		info!("Flock canvas started at {}x{} (dpr {})", w, h, dpr);

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let resized = measure(&canvas_resize).and_then(|(nw, nh, ndpr)| {
				fit(&canvas_resize, nw, nh, ndpr)?;
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh, ndpr);
				}
				Ok(())
			});
			if let Err(err) = resized {
				error!("Resize failed: {}", err);
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			win.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref())?;
		}

		let (state_anim, animate_inner, controller_anim) =
			(state_init.clone(), animate_init.clone(), controller_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.frame(&controller_anim);
				match render::render(s, &ctx) {
					Ok(tooltip) => {
						if controller_anim.tooltip.with_untracked(|t| *t != tooltip) {
							controller_anim.tooltip.set(tooltip);
						}
					}
					Err(err) => error!("Render failed: {:?}", err),
				}
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				if let Some(win) = web_sys::window() {
					let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			win.request_animation_frame(cb.as_ref().unchecked_ref())?;
		}
		Ok(())
	};

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if let Err(err) = start(canvas.into()) {
			error!("Flock canvas failed to start: {}", err);
		}
	});

	let canvas_point = move |x: i32, y: i32| -> Option<(f64, f64)> {
		let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?.into();
		let rect = canvas.get_bounding_client_rect();
		Some((f64::from(x) - rect.left(), f64::from(y) - rect.top()))
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(ev.client_x(), ev.client_y()) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_moved(x, y);
		}
	};

	let state_tm = state.clone();
	let on_touchmove = move |ev: TouchEvent| {
		ev.prevent_default();
		let Some(touch) = ev.touches().get(0) else {
			return;
		};
		let Some((x, y)) = canvas_point(touch.client_x(), touch.client_y()) else {
			return;
		};
		if let Some(ref mut s) = *state_tm.borrow_mut() {
			s.pointer_moved(x, y);
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_left();
		}
	};

	let state_te = state.clone();
	let on_touchend = move |_: TouchEvent| {
		if let Some(ref mut s) = *state_te.borrow_mut() {
			s.pointer_left();
		}
	};

	let on_click = move |_: MouseEvent| controller.unlock_audio();

	view! {
		<canvas
			node_ref=canvas_ref
			class="flock-canvas"
			on:click=on_click
			on:mousemove=on_mousemove
			on:mouseleave=on_mouseleave
			on:touchmove=on_touchmove
			on:touchend=on_touchend
			style="display: block; touch-action: none;"
		/>
	}
}
