use std::f64::consts::PI;

use rand::Rng;
use rand::rngs::SmallRng;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::CanvasState;
use crate::sim::projection::depth_order;
use crate::sim::{Mode, NodeLevel, Rgb, Scene};

/// Memory line shown next to the pointer while it rests on a node label.
#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
	/// Cleaned memory text.
	pub fact: String,
	/// Left edge in canvas pixels.
	pub x: f64,
	/// Top edge in canvas pixels.
	pub y: f64,
}

/// Draw one frame. Returns the tooltip for the hovered label, if it has a fact.
pub fn render(
	state: &mut CanvasState,
	ctx: &CanvasRenderingContext2d,
) -> Result<Option<Tooltip>, JsValue> {
	let dpr = state.dpr;
	ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
	let scene = &state.scene;
	let order = depth_order(scene.projected());

	draw_background(scene, ctx, &mut state.rng)?;
	ctx.set_global_composite_operation("lighter")?;
	draw_proximity_lines(scene, ctx);
	draw_edges(scene, ctx)?;
	draw_particles(scene, ctx, &order)?;
	ctx.set_global_composite_operation("source-over")?;

	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	let hovered = draw_labels(scene, ctx, &order, state.mouse, &mut state.rng)?;
	draw_glow(scene, ctx)?;
	draw_keywords(scene, ctx)?;
	draw_food(scene, ctx)?;

	Ok(hovered.and_then(|i| {
		let fact = scene.agents()[i].node.as_ref()?.fact.clone()?;
		let mouse = state.mouse?;
		Some(Tooltip {
			fact,
			x: f64::from(mouse.x) + 15.0,
			y: f64::from(mouse.y) + 15.0,
		})
	}))
}

fn size(scene: &Scene) -> (f64, f64) {
	let (w, h) = scene.size();
	(f64::from(w), f64::from(h))
}

fn draw_background(
	scene: &Scene,
	ctx: &CanvasRenderingContext2d,
	rng: &mut SmallRng,
) -> Result<(), JsValue> {
	let (w, h) = size(scene);
	let gradient = ctx.create_radial_gradient(w / 2.0, h / 2.0, 0.0, w / 2.0, h / 2.0, w * 0.85)?;
	if scene.is_glitching() && rng.random::<f32>() > 0.8 {
		gradient.add_color_stop(0.0, "rgba(50, 0, 0, 0.9)")?;
		gradient.add_color_stop(1.0, "rgba(0, 0, 0, 1)")?;
	} else {
		gradient.add_color_stop(0.0, "rgba(5, 8, 15, 0.2)")?;
		gradient.add_color_stop(0.6, "rgba(3, 4, 8, 0.8)")?;
		gradient.add_color_stop(1.0, "rgba(0, 0, 0, 1)")?;
	}
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill_rect(0.0, 0.0, w, h);
	Ok(())
}

/// Faint lines between each point and two pseudo-random partners, tinted by height.
fn draw_proximity_lines(scene: &Scene, ctx: &CanvasRenderingContext2d) {
	let proj = scene.projected();
	let n = proj.len();
	if n == 0 {
		return;
	}
	let (_, h) = size(scene);
	let alpha_mod = if scene.mode() == Mode::Question { 0.3 } else { 1.0 };
	ctx.set_line_width(1.0);

	for (i, p1) in proj.iter().enumerate() {
		if !p1.visible() {
			continue;
		}
		for j in 1..3 {
			let p2 = &proj[(i + j * 7) % n];
			if !p2.visible() {
				continue;
			}
			let d = f64::from((p1.x - p2.x).hypot(p1.y - p2.y));
			let scale = f64::from(p1.scale);
			let max_d = 60.0 * scale;
			if d >= max_d {
				continue;
			}
			let alpha = (1.0 - d / max_d) * 0.3 * scale * alpha_mod;
			if alpha < 0.05 {
				continue;
			}
			let c = scene.agents()[i].color;
			let y_factor = (f64::from(p1.y) / h).clamp(0.0, 1.0) as f32;
			let tint = Rgb::new(c.r + y_factor * 20.0, c.g, c.b + (1.0 - y_factor) * 40.0);
			ctx.set_stroke_style_str(&tint.rgba(alpha));
			ctx.begin_path();
			ctx.move_to(f64::from(p1.x), f64::from(p1.y));
			ctx.line_to(f64::from(p2.x), f64::from(p2.y));
			ctx.stroke();
		}
	}
}

fn draw_edges(scene: &Scene, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
	let (agents, proj) = (scene.agents(), scene.projected());
	for (i, agent) in agents.iter().enumerate() {
		let (Some(node), Some(gp)) = (agent.node.as_ref(), proj.get(i)) else {
			continue;
		};
		if !gp.visible() {
			continue;
		}
		let level = f64::from(node.level.depth());
		for parent in &node.parents {
			let (Some(parent_node), Some(pp)) = (
				agents.get(parent.0).and_then(|a| a.node.as_ref()),
				proj.get(parent.0),
			) else {
				continue;
			};
			if parent_node.epoch != node.epoch || !pp.visible() {
				continue;
			}
			ctx.set_line_width((((4.0 - level) * 0.8) * f64::from(gp.scale)).max(0.5));
			let alpha = f64::from(node.opacity.min(parent_node.opacity)) * (0.8 - level * 0.1);
			let (x1, y1, x2, y2) = (
				f64::from(gp.x),
				f64::from(gp.y),
				f64::from(pp.x),
				f64::from(pp.y),
			);
			let gradient = ctx.create_linear_gradient(x1, y1, x2, y2);
			gradient.add_color_stop(0.0, &node.color.rgba(alpha))?;
			gradient.add_color_stop(0.5, &Rgb::WHITE.rgba(alpha * 0.5))?;
			gradient.add_color_stop(1.0, &parent_node.color.rgba(alpha))?;
			#[allow(deprecated)]
			ctx.set_stroke_style(&gradient);
			ctx.begin_path();
			ctx.move_to(x1, y1);
			ctx.line_to(x2, y2);
			ctx.stroke();
		}
	}
	Ok(())
}

fn diamond(ctx: &CanvasRenderingContext2d, x: f64, y: f64, r: f64) {
	ctx.begin_path();
	ctx.move_to(x, y - r);
	ctx.line_to(x + r, y);
	ctx.line_to(x, y + r);
	ctx.line_to(x - r, y);
	ctx.close_path();
	ctx.fill();
}

fn draw_particles(
	scene: &Scene,
	ctx: &CanvasRenderingContext2d,
	order: &[usize],
) -> Result<(), JsValue> {
	let (agents, proj) = (scene.agents(), scene.projected());
	let director = scene.mode() == Mode::Director;
	let time = f64::from(scene.time());

	for &i in order {
		let (agent, p) = (&agents[i], proj[i]);
		if !p.visible() {
			continue;
		}
		let (x, y, scale) = (f64::from(p.x), f64::from(p.y), f64::from(p.scale));
		let mut color = agent.color;
		let mut alpha = (scale * 1.8).min(1.0);

		if director && agent.node.is_none() {
			let (w, h) = (15.0 * scale, 2.0 * scale);
			ctx.set_fill_style_str(&color.rgba(alpha * 0.8));
			ctx.fill_rect(x - w / 2.0, y - h / 2.0, w, h);
			continue;
		}

		let mut radius = f64::from(agent.glyph_radius()) * scale;
		if let Some(node) = &agent.node {
			color = node.color;
			radius *= 2.2;
			alpha = f64::from(node.opacity);
		}
		if agent.born_time > 0.0 {
			color = Rgb::WHITE;
			alpha = 1.0;
			radius *= 2.5;
		}
		if agent.fear > 0.0 {
			radius *= 1.3;
		}
		ctx.set_fill_style_str(&color.rgba(alpha));

		if agent.node.is_some() {
			diamond(ctx, x, y, radius * 1.5);
			let pulse = 1.0 + (time * 5.0 + i as f64).sin() * 0.3;
			ctx.set_stroke_style_str(&color.rgba(alpha * 0.3));
			ctx.set_line_width(1.0);
			ctx.begin_path();
			ctx.arc(x, y, radius * 2.0 * pulse, 0.0, 2.0 * PI)?;
			ctx.stroke();
		} else if radius < 2.0 {
			ctx.fill_rect(x - radius / 2.0, y - radius / 2.0, radius, radius);
		} else {
			diamond(ctx, x, y, radius);
		}
	}
	Ok(())
}

fn round_rect(
	ctx: &CanvasRenderingContext2d,
	x: f64,
	y: f64,
	w: f64,
	h: f64,
	r: f64,
) -> Result<(), JsValue> {
	let r = r.min(w / 2.0).min(h / 2.0);
	ctx.begin_path();
	ctx.move_to(x + r, y);
	ctx.arc_to(x + w, y, x + w, y + h, r)?;
	ctx.arc_to(x + w, y + h, x, y + h, r)?;
	ctx.arc_to(x, y + h, x, y, r)?;
	ctx.arc_to(x, y, x + w, y, r)?;
	ctx.close_path();
	ctx.fill();
	Ok(())
}

/// Label boxes above every node, nearest last. Returns the agent whose label
/// box contains the pointer.
fn draw_labels(
	scene: &Scene,
	ctx: &CanvasRenderingContext2d,
	order: &[usize],
	mouse: Option<glam::Vec2>,
	rng: &mut SmallRng,
) -> Result<Option<usize>, JsValue> {
	let (agents, proj) = (scene.agents(), scene.projected());
	let mut hovered = None;

	for &i in order {
		let (Some(node), p) = (agents[i].node.as_ref(), proj[i]) else {
			continue;
		};
		if !p.visible() {
			continue;
		}
		let scale = f64::from(p.scale);
		let base = match node.level {
			NodeLevel::Root => 26.0,
			NodeLevel::Branch => 18.0,
			NodeLevel::Leaf => 12.0,
		};
		let font_size = (base * scale).floor().max(9.0);
		ctx.set_font(&format!("bold {}px 'Courier New'", font_size));

		let opacity = f64::from(node.opacity);
		let text_width = ctx.measure_text(&node.label)?.width();
		let (box_w, box_h) = (text_width + 24.0 * scale, font_size + 12.0 * scale);
		let (x, label_y) = (f64::from(p.x), f64::from(p.y) - 20.0 * scale);
		let (box_x, box_y) = (x - box_w / 2.0, label_y - box_h / 2.0);

		if let Some(m) = mouse {
			let (mx, my) = (f64::from(m.x), f64::from(m.y));
			if mx >= box_x && mx <= box_x + box_w && my >= box_y && my <= box_y + box_h {
				hovered = Some(i);
			}
		}

		ctx.set_fill_style_str(&format!("rgba(5, 8, 15, {})", 0.8 * opacity));
		round_rect(ctx, box_x, box_y, box_w, box_h, 8.0 * scale)?;
		ctx.set_stroke_style_str(&node.color.rgba(opacity * 0.4));
		ctx.set_line_width(1.0);
		ctx.stroke();

		if scene.is_thinking() && rng.random::<f32>() > 0.9 {
			ctx.set_fill_style_str(&format!("rgba(255, 0, 0, {})", opacity));
			ctx.fill_text(&node.label, x - 2.0, label_y)?;
			ctx.set_fill_style_str(&format!("rgba(0, 255, 255, {})", opacity));
			ctx.fill_text(&node.label, x + 2.0, label_y)?;
		}
		ctx.set_fill_style_str(&node.color.rgba(opacity));
		ctx.fill_text(&node.label, x, label_y)?;
	}
	Ok(hovered)
}

fn draw_glow(scene: &Scene, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
	let glow = f64::from(scene.glow());
	if glow <= 0.05 {
		return Ok(());
	}
	let center = scene.center();
	let (cx, cy) = (f64::from(center.x), f64::from(center.y));
	let r = 100.0 + glow * 200.0;
	let gradient = ctx.create_radial_gradient(cx, cy, 0.0, cx, cy, r)?;
	gradient.add_color_stop(0.0, &scene.palette().primary.rgba(glow * 0.5))?;
	gradient.add_color_stop(1.0, "transparent")?;
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.begin_path();
	ctx.arc(cx, cy, r, 0.0, 2.0 * PI)?;
	ctx.fill();
	Ok(())
}

/// Keyword labels pinned to evenly spaced agents close to the camera.
fn draw_keywords(scene: &Scene, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
	let (agents, proj) = (scene.agents(), scene.projected());
	let labels = scene.keywords();
	if proj.is_empty() || labels.is_empty() {
		return Ok(());
	}
	ctx.set_font("10px monospace");
	for (i, label) in labels.iter().enumerate() {
		let idx = i * proj.len() / labels.len();
		let p = proj[idx];
		if p.visible() && p.scale > 0.7 {
			ctx.set_fill_style_str(&agents[idx].color.rgba(0.6));
			ctx.fill_text(label, f64::from(p.x) + 12.0, f64::from(p.y) + 4.0)?;
		}
	}
	Ok(())
}

fn draw_food(scene: &Scene, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
	let feeding = scene.feeding();
	if !feeding.is_active() {
		return Ok(());
	}
	let center = scene.center();
	let shimmer = 0.5 + (f64::from(scene.time()) * 20.0).sin() * 0.5;
	let fill = scene.palette().primary.rgba(0.8 + shimmer * 0.2);
	ctx.set_font("bold 22px 'Courier New'");
	let mut glyph = [0u8; 4];
	for fp in feeding.particles() {
		ctx.save();
		ctx.translate(
			f64::from(center.x + fp.pos.x),
			f64::from(center.y + fp.pos.y),
		)?;
		ctx.scale(f64::from(fp.scale), f64::from(fp.scale))?;
		ctx.set_fill_style_str(&fill);
		ctx.fill_text(fp.glyph.encode_utf8(&mut glyph), 0.0, 0.0)?;
		ctx.restore();
	}
	Ok(())
}
