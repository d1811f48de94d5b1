//! Knowledge-graph overlay.
//!
//! A graph arrives as a [`GraphPayload`] (roots, their branches, the branches'
//! leaves and optional cross links). Building it picks random free agents and
//! attaches a [`GraphNode`] to each; the agent then glides to its slot in the
//! hierarchy while the rest of the flock murmurs around it. Labels are
//! de-duplicated case-insensitively, so a concept mentioned under two parents
//! becomes one node with two parent links.

use std::collections::HashMap;
use std::f32::consts::TAU;

use glam::Vec3;
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::agent::{Agent, AgentId};
use super::color::Rgb;
use super::error::SceneError;
use super::mood::Mood;
use super::physics::Attractor;

/// Radius of the circle multiple roots are spread on.
const ROOT_RING_RADIUS: f32 = 350.0;

/// Depth of a node in the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeLevel {
	/// Top-level concept.
	Root = 1,
	/// Sub-topic orbiting a root.
	Branch = 2,
	/// Detail orbiting a branch.
	Leaf = 3,
}

impl NodeLevel {
	/// Numeric level, 1 to 3.
	pub fn depth(self) -> u8 {
		self as u8
	}
}

/// A labelled attractor embodied by exactly one agent.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	/// Upper-cased label.
	pub label: String,
	/// Hierarchy level.
	pub level: NodeLevel,
	/// Mood the node was tinted with.
	pub mood: Mood,
	/// Node colour.
	pub color: Rgb,
	/// Importance derived from how often the label appears in recent context.
	pub weight: f32,
	/// Agents embodying this node's parents; the first one is orbited.
	pub parents: Vec<AgentId>,
	/// Fade state, `0.0..=1.0`.
	pub opacity: f32,
	/// Whether the node is dissolving.
	pub dying: bool,
	/// Frames left before a dissolving node starts fading.
	pub death_timer: f32,
	/// Fixed target of a root.
	pub anchor: Vec3,
	/// Orbit radius of a leaf.
	pub orbit_radius: f32,
	/// Orbit phase.
	pub angle_index: f32,
	/// Memory line shown when hovering the label.
	pub fact: Option<String>,
	/// Build generation this node belongs to.
	pub epoch: u32,
}

impl GraphNode {
	/// A fresh, fully transparent node.
	pub fn new(
		label: &str,
		level: NodeLevel,
		mood: Mood,
		color: Rgb,
		weight: f32,
		epoch: u32,
	) -> Self {
		Self {
			label: label.to_uppercase(),
			level,
			mood,
			color,
			weight,
			parents: Vec::new(),
			opacity: 0.0,
			dying: false,
			death_timer: 0.0,
			anchor: Vec3::ZERO,
			orbit_radius: 180.0,
			angle_index: 0.0,
			fact: None,
			epoch,
		}
	}

	fn add_parent(&mut self, parent: AgentId) {
		if !self.parents.contains(&parent) {
			self.parents.push(parent);
		}
	}
}

/// Graph data as supplied by the chat collaborator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
	/// Top-level concepts.
	#[serde(default)]
	pub roots: Vec<RootSpec>,
	/// Extra edges between any two labels.
	#[serde(default)]
	pub links: Vec<LinkSpec>,
	/// Overall mood of the reply.
	#[serde(default)]
	pub mood: Option<String>,
	/// Flat keyword list, used when no roots are given.
	#[serde(default)]
	pub keywords: Vec<String>,
	/// Text to speak.
	#[serde(default)]
	pub response: Option<String>,
	/// Memory lines retrieved for this reply; node facts are drawn from them.
	#[serde(default)]
	pub memories: Vec<String>,
}

/// A root and its branches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RootSpec {
	/// Root label.
	#[serde(default)]
	pub label: Option<String>,
	/// Mood override for this subtree.
	#[serde(default)]
	pub mood: Option<String>,
	/// Sub-topics.
	#[serde(default)]
	pub branches: Vec<BranchSpec>,
}

/// A branch and its leaves. The label may arrive as `label` or `text`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchSpec {
	/// Branch label.
	#[serde(default)]
	pub label: Option<String>,
	/// Alternative spelling of the label.
	#[serde(default)]
	pub text: Option<String>,
	/// Mood override for this branch and its leaves.
	#[serde(default)]
	pub mood: Option<String>,
	/// Details.
	#[serde(default)]
	pub leaves: Vec<LeafSpec>,
}

impl BranchSpec {
	/// The label, whichever field carried it.
	pub fn name(&self) -> Option<&str> {
		non_blank(&self.label).or(non_blank(&self.text))
	}
}

fn non_blank(s: &Option<String>) -> Option<&str> {
	s.as_deref().filter(|v| !v.trim().is_empty())
}

/// A leaf is either bare text or text with its own mood.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeafSpec {
	/// Just the label.
	Text(String),
	/// Label plus mood.
	Detailed {
		/// Leaf label.
		text: String,
		/// Mood override.
		#[serde(default)]
		mood: Option<String>,
	},
}

impl LeafSpec {
	/// Leaf label.
	pub fn text(&self) -> &str {
		match self {
			LeafSpec::Text(t) => t,
			LeafSpec::Detailed { text, .. } => text,
		}
	}

	/// Leaf mood override.
	pub fn mood(&self) -> Option<&str> {
		match self {
			LeafSpec::Text(_) => None,
			LeafSpec::Detailed { mood, .. } => mood.as_deref(),
		}
	}
}

/// A cross link; `source` gains `target` as an extra parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
	/// Child label.
	pub source: String,
	/// Parent label.
	pub target: String,
}

impl GraphPayload {
	/// Parse a payload from raw model output, tolerating text or code fences
	/// around the outermost JSON object.
	pub fn parse(raw: &str) -> Result<Self, SceneError> {
		let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
			return Err(SceneError::MissingObject);
		};
		if end < start {
			return Err(SceneError::MissingObject);
		}
		Ok(serde_json::from_str(&raw[start..=end])?)
	}

	/// A single-root graph built from a flat keyword list: the first keyword is
	/// the root, the rest are its branches.
	pub fn from_keywords(keywords: &[String]) -> Self {
		let Some((root, rest)) = keywords.split_first() else {
			return Self::default();
		};
		Self {
			roots: vec![RootSpec {
				label: Some(root.clone()),
				mood: None,
				branches: rest
					.iter()
					.map(|k| BranchSpec {
						label: Some(k.clone()),
						..BranchSpec::default()
					})
					.collect(),
			}],
			keywords: keywords.to_vec(),
			..Self::default()
		}
	}

	/// Roots if present, otherwise the keyword fallback.
	pub fn effective_roots(&self) -> Vec<RootSpec> {
		if self.roots.is_empty() {
			Self::from_keywords(&self.keywords).roots
		} else {
			self.roots.clone()
		}
	}

	/// Every label in the payload, upper-cased, in document order.
	pub fn flat_keywords(&self) -> Vec<String> {
		if self.roots.is_empty() {
			return self
				.keywords
				.iter()
				.filter(|k| !k.trim().is_empty())
				.map(|k| k.to_uppercase())
				.collect();
		}
		let mut out = Vec::new();
		for root in &self.roots {
			out.extend(root.label.clone());
			for branch in &root.branches {
				out.extend(branch.name().map(str::to_owned));
				out.extend(branch.leaves.iter().map(|l| l.text().to_owned()));
			}
		}
		out.retain(|k| !k.trim().is_empty());
		out.iter().map(|k| k.to_uppercase()).collect()
	}

	/// Parsed top-level mood, if any.
	pub fn parsed_mood(&self) -> Option<Mood> {
		self.mood.as_deref().map(Mood::parse_lenient)
	}
}

/// Recent conversation text that node weights and facts are derived from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphContext {
	corpus: String,
	memories: Vec<String>,
}

impl GraphContext {
	/// Combine chat history lines and retrieved memory lines.
	pub fn new<I, S>(history: I, memories: Vec<String>) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut corpus = history
			.into_iter()
			.map(|h| h.as_ref().to_lowercase())
			.collect::<Vec<_>>()
			.join(" ");
		for m in &memories {
			corpus.push(' ');
			corpus.push_str(&m.to_lowercase());
		}
		Self { corpus, memories }
	}

	/// `max(1, log2(occurrences + 2))` over case-insensitive matches of `label`.
	pub fn weight(&self, label: &str) -> f32 {
		let needle = label.to_lowercase();
		let occurrences = if needle.is_empty() {
			0
		} else {
			self.corpus.matches(needle.as_str()).count()
		};
		((occurrences + 2) as f32).log2().max(1.0)
	}

	/// Memory lines available for derived facts.
	pub fn memories(&self) -> &[String] {
		&self.memories
	}
}

/// One row of the mood legend.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
	/// Mood.
	pub mood: Mood,
	/// Living nodes with this mood.
	pub count: usize,
	/// Share of all living nodes, `0..=100`.
	pub percent: f32,
}

/// Tracks which agents embody the current graph and drives node lifecycles.
#[derive(Debug, Default)]
pub struct GraphOverlay {
	active: Vec<AgentId>,
	epoch: u32,
	revision: u64,
}

struct Builder<'a, R: Rng> {
	agents: &'a mut [Agent],
	free: Vec<usize>,
	by_label: HashMap<String, AgentId>,
	created: Vec<AgentId>,
	context: &'a GraphContext,
	epoch: u32,
	rng: &'a mut R,
}

impl<R: Rng> Builder<'_, R> {
	/// Attach a node to a random free agent, keeping at least one agent free.
	fn create(&mut self, label: &str, level: NodeLevel, mood: Mood) -> Option<AgentId> {
		if self.free.len() <= 1 {
			return None;
		}
		let slot = self.rng.random_range(0..self.free.len());
		let id = AgentId(self.free.swap_remove(slot));
		let color = mood.palette().primary.jitter(&mut *self.rng, 20.0);
		let weight = self.context.weight(label);
		self.agents[id.0].node = Some(GraphNode::new(label, level, mood, color, weight, self.epoch));
		self.by_label.insert(label.to_uppercase(), id);
		self.created.push(id);
		Some(id)
	}

	fn lookup(&self, label: &str) -> Option<AgentId> {
		self.by_label.get(&label.to_uppercase()).copied()
	}

	fn node_mut(&mut self, id: AgentId) -> Option<&mut GraphNode> {
		self.agents[id.0].node.as_mut()
	}
}

impl GraphOverlay {
	/// Agents embodying the current graph.
	pub fn active(&self) -> &[AgentId] {
		&self.active
	}

	/// Current build generation.
	pub fn epoch(&self) -> u32 {
		self.epoch
	}

	/// Bumped whenever the set of living nodes changes shape.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// Dissolve whatever is showing and build `payload` on free agents.
	///
	/// Returns the number of nodes created. Nothing is built when the flock has
	/// fewer than `min_agents` agents or the payload has no roots.
	pub fn rebuild(
		&mut self,
		agents: &mut [Agent],
		payload: &GraphPayload,
		context: &GraphContext,
		fallback_mood: Mood,
		min_agents: usize,
		rng: &mut impl Rng,
	) -> usize {
		self.dissolve(agents, rng);
		self.active.clear();
		self.revision += 1;

		let roots = payload.effective_roots();
		if agents.len() < min_agents || roots.is_empty() {
			return 0;
		}
		self.epoch = self.epoch.wrapping_add(1);
		let global_mood = payload.parsed_mood().unwrap_or(fallback_mood);

		let free: Vec<usize> = agents
			.iter()
			.enumerate()
			.filter(|(_, a)| a.is_free())
			.map(|(i, _)| i)
			.collect();
		let mut b = Builder {
			agents,
			free,
			by_label: HashMap::new(),
			created: Vec::new(),
			context,
			epoch: self.epoch,
			rng,
		};

		let root_count = roots.len();
		for (r_idx, root) in roots.iter().enumerate() {
			let root_label = root.label.as_deref().unwrap_or("UNKNOWN");
			let root_mood = root.mood.as_deref().map(Mood::parse_lenient).unwrap_or(global_mood);

			let root_id = match b.lookup(root_label) {
				Some(id) => id,
				None => {
					let Some(id) = b.create(root_label, NodeLevel::Root, root_mood) else {
						break;
					};
					if root_count > 1 {
						let angle = r_idx as f32 / root_count as f32 * TAU;
						if let Some(node) = b.node_mut(id) {
							node.anchor =
								Vec3::new(angle.cos(), angle.sin(), 0.0) * ROOT_RING_RADIUS;
						}
					}
					id
				}
			};

			let branch_count = root.branches.len();
			for (b_idx, branch) in root.branches.iter().enumerate() {
				let Some(branch_label) = branch.name() else {
					continue;
				};
				let branch_mood = branch
					.mood
					.as_deref()
					.map(Mood::parse_lenient)
					.unwrap_or(root_mood);

				let branch_id = match b.lookup(branch_label) {
					Some(id) => {
						if let Some(node) = b.node_mut(id) {
							if id != root_id {
								node.add_parent(root_id);
							}
						}
						id
					}
					None => {
						let Some(id) = b.create(branch_label, NodeLevel::Branch, branch_mood) else {
							break;
						};
						if let Some(node) = b.node_mut(id) {
							node.parents.push(root_id);
							node.angle_index = b_idx as f32 / branch_count as f32 * TAU;
						}
						id
					}
				};

				let leaf_count = branch.leaves.len();
				for (l_idx, leaf) in branch.leaves.iter().enumerate() {
					let leaf_label = leaf.text();
					if let Some(id) = b.lookup(leaf_label) {
						if id != branch_id {
							if let Some(node) = b.node_mut(id) {
								node.add_parent(branch_id);
							}
						}
						continue;
					}
					let leaf_mood = leaf.mood().map(Mood::parse_lenient).unwrap_or(branch_mood);
					let Some(id) = b.create(leaf_label, NodeLevel::Leaf, leaf_mood) else {
						break;
					};
					if let Some(node) = b.node_mut(id) {
						node.parents.push(branch_id);
						node.orbit_radius = if l_idx % 2 == 0 { 150.0 } else { 220.0 };
						node.angle_index =
							l_idx as f32 / leaf_count as f32 * TAU + b_idx as f32 * 0.5;
					}
				}
			}
		}

		for link in &payload.links {
			if let (Some(source), Some(target)) = (b.lookup(&link.source), b.lookup(&link.target))
			{
				if source != target {
					if let Some(node) = b.node_mut(source) {
						node.add_parent(target);
					}
				}
			}
		}

		let created = std::mem::take(&mut b.created);
		let agents = b.agents;
		self.active = created;
		let memories: Vec<String> = context
			.memories()
			.iter()
			.chain(&payload.memories)
			.cloned()
			.collect();
		self.assign_facts(agents, &memories);
		info!(
			"Knowledge graph built: {} nodes (epoch {})",
			self.active.len(),
			self.epoch
		);
		self.active.len()
	}

	/// Detach every node immediately, including ones still fading out.
	pub fn clear(&mut self, agents: &mut [Agent]) {
		for agent in agents.iter_mut() {
			agent.node = None;
		}
		self.active.clear();
		self.revision += 1;
	}

	/// Start dissolving the current graph with level-staggered timers.
	pub fn dissolve(&mut self, agents: &mut [Agent], rng: &mut impl Rng) {
		let mut started = 0;
		for id in &self.active {
			let Some(node) = agents.get_mut(id.0).and_then(|a| a.node.as_mut()) else {
				continue;
			};
			if node.dying || node.epoch != self.epoch {
				continue;
			}
			node.dying = true;
			node.death_timer = match node.level {
				NodeLevel::Leaf => rng.random_range(0.0..40.0),
				NodeLevel::Branch => rng.random_range(40.0..90.0),
				NodeLevel::Root => rng.random_range(100.0..140.0),
			};
			started += 1;
		}
		if started > 0 {
			debug!("Dissolving {} graph nodes", started);
			self.revision += 1;
		}
	}

	/// One frame of fade-in / fade-out. Fully faded nodes detach from their agent.
	pub fn advance_lifecycle(&mut self, agents: &mut [Agent]) {
		let mut detached = false;
		for agent in agents.iter_mut() {
			let Some(node) = agent.node.as_mut() else {
				continue;
			};
			if !node.dying {
				node.opacity = (node.opacity + 0.02).min(1.0);
				continue;
			}
			if node.death_timer > 0.0 {
				node.death_timer = (node.death_timer - 1.0).max(0.0);
				continue;
			}
			node.opacity -= 0.025;
			if node.opacity <= 0.0 {
				agent.node = None;
				detached = true;
			}
		}
		if detached {
			self.active.retain(|id| agents[id.0].node.is_some());
		}
	}

	/// First parent of `node` still embodying a node of the same epoch.
	pub fn live_parent<'a>(&self, agents: &'a [Agent], node: &GraphNode) -> Option<&'a Agent> {
		node.parents
			.iter()
			.filter_map(|p| agents.get(p.0))
			.find(|a| a.node.as_ref().is_some_and(|n| n.epoch == node.epoch))
	}

	/// Living, non-root nodes the free flock is drawn towards.
	pub fn attractors(&self, agents: &[Agent]) -> Vec<Attractor> {
		self.active
			.iter()
			.filter_map(|id| agents.get(id.0))
			.filter_map(|a| {
				let node = a.living_node()?;
				(node.level != NodeLevel::Root).then_some(Attractor {
					pos: a.pos,
					weight: node.weight,
					color: node.color,
				})
			})
			.collect()
	}

	/// Per-mood share of living nodes, largest first.
	pub fn legend(&self, agents: &[Agent]) -> Vec<LegendEntry> {
		let mut counts = [0usize; Mood::ALL.len()];
		let mut total = 0;
		for node in self.active.iter().filter_map(|id| agents.get(id.0)?.living_node()) {
			if let Some(slot) = Mood::ALL.iter().position(|m| *m == node.mood) {
				counts[slot] += 1;
				total += 1;
			}
		}
		if total == 0 {
			return Vec::new();
		}
		let mut entries: Vec<LegendEntry> = Mood::ALL
			.iter()
			.zip(counts)
			.filter(|(_, c)| *c > 0)
			.map(|(mood, count)| LegendEntry {
				mood: *mood,
				count,
				percent: count as f32 / total as f32 * 100.0,
			})
			.collect();
		entries.sort_by(|a, b| b.count.cmp(&a.count));
		entries
	}

	/// Give each node the first unused memory line mentioning its label.
	pub fn assign_facts(&self, agents: &mut [Agent], memories: &[String]) {
		let lowered: Vec<String> = memories.iter().map(|m| m.to_lowercase()).collect();
		let mut used = vec![false; memories.len()];
		for id in &self.active {
			let Some(node) = agents.get_mut(id.0).and_then(|a| a.node.as_mut()) else {
				continue;
			};
			let label = node.label.to_lowercase();
			let hit = lowered
				.iter()
				.enumerate()
				.find(|(i, m)| !used[*i] && m.contains(&label))
				.map(|(i, _)| i);
			node.fact = hit.map(|i| {
				used[i] = true;
				clean_fact(&memories[i])
			});
		}
	}
}

/// Strip `[...]` annotations, trim, and capitalise the first letter.
fn clean_fact(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	let mut rest = raw;
	while let Some(open) = rest.find('[') {
		match rest[open..].find(']') {
			Some(close) => {
				out.push_str(&rest[..open]);
				rest = &rest[open + close + 1..];
			}
			None => break,
		}
	}
	out.push_str(rest);
	let trimmed = out.trim();
	let mut chars = trimmed.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::SmallRng;

	use super::*;
	use crate::sim::color::Palette;

	fn flock(n: usize, rng: &mut SmallRng) -> Vec<Agent> {
		(0..n)
			.map(|_| Agent::spawn(rng, 6.0, &Palette::CHAMPAGNE))
			.collect()
	}

	fn nodes(agents: &[Agent]) -> Vec<&GraphNode> {
		agents.iter().filter_map(|a| a.node.as_ref()).collect()
	}

	fn find<'a>(agents: &'a [Agent], label: &str) -> (AgentId, &'a GraphNode) {
		agents
			.iter()
			.enumerate()
			.find_map(|(i, a)| {
				a.node
					.as_ref()
					.filter(|n| n.label == label)
					.map(|n| (AgentId(i), n))
			})
			.unwrap_or_else(|| panic!("no node labelled {label}"))
	}

	const SAMPLE: &str = r#"Sure! ```json
	{
		"mood": "curious",
		"roots": [
			{ "label": "Ocean", "branches": [
				{ "label": "Tides", "leaves": ["moon", {"text": "Gravity", "mood": "sad"}] },
				{ "text": "Whales", "leaves": ["song"] }
			]},
			{ "label": "Space", "mood": "joyful", "branches": [
				{ "label": "moon", "leaves": [] },
				{ "label": "Tides" }
			]}
		],
		"links": [{ "source": "song", "target": "Space" }]
	}
	```"#;

	#[test]
	fn parse_extracts_json_from_fenced_text() {
		let payload = GraphPayload::parse(SAMPLE).unwrap();
		assert_eq!(payload.roots.len(), 2);
		assert_eq!(payload.roots[0].branches[1].name(), Some("Whales"));
		assert_eq!(payload.parsed_mood(), Some(Mood::Curious));
		assert!(matches!(
			GraphPayload::parse("no json here"),
			Err(SceneError::MissingObject)
		));
		assert!(matches!(
			GraphPayload::parse("{ not json }"),
			Err(SceneError::InvalidPayload(_))
		));
	}

	#[test]
	fn flat_keywords_are_upper_cased_in_order() {
		let payload = GraphPayload::parse(SAMPLE).unwrap();
		assert_eq!(
			payload.flat_keywords(),
			vec![
				"OCEAN", "TIDES", "MOON", "GRAVITY", "WHALES", "SONG", "SPACE", "MOON", "TIDES"
			]
		);
	}

	#[test]
	fn keyword_payload_becomes_single_root_tree() {
		let payload = GraphPayload {
			keywords: vec!["alpha".into(), "beta".into(), "gamma".into()],
			..GraphPayload::default()
		};
		let roots = payload.effective_roots();
		assert_eq!(roots.len(), 1);
		assert_eq!(roots[0].label.as_deref(), Some("alpha"));
		assert_eq!(roots[0].branches.len(), 2);
		assert_eq!(payload.flat_keywords(), vec!["ALPHA", "BETA", "GAMMA"]);
	}

	#[test]
	fn weight_grows_logarithmically_with_mentions() {
		let ctx = GraphContext::new(["The moon and the MOON", "no match"], vec![
			"moon landing".into(),
		]);
		assert!((ctx.weight("moon") - 5.0_f32.log2()).abs() < 1e-6);
		assert_eq!(ctx.weight("absent"), 1.0);
		assert_eq!(ctx.weight(""), 1.0);
	}

	#[test]
	fn build_deduplicates_labels_and_links_parents() {
		let mut rng = SmallRng::seed_from_u64(11);
		let mut agents = flock(200, &mut rng);
		let mut overlay = GraphOverlay::default();
		let payload = GraphPayload::parse(SAMPLE).unwrap();
		let built = overlay.rebuild(
			&mut agents,
			&payload,
			&GraphContext::default(),
			Mood::Neutral,
			50,
			&mut rng,
		);

		// OCEAN TIDES MOON GRAVITY WHALES SONG SPACE
		assert_eq!(built, 7);
		assert_eq!(nodes(&agents).len(), 7);
		assert_eq!(overlay.active().len(), 7);

		let (ocean, _) = find(&agents, "OCEAN");
		let (space, space_node) = find(&agents, "SPACE");
		let (tides, tides_node) = find(&agents, "TIDES");
		let (_, moon) = find(&agents, "MOON");
		let (_, song) = find(&agents, "SONG");
		let (_, gravity) = find(&agents, "GRAVITY");

		assert_eq!(space_node.mood, Mood::Joyful);
		assert_eq!(tides_node.parents, vec![ocean, space]);
		assert_eq!(moon.level, NodeLevel::Leaf);
		assert_eq!(moon.parents.len(), 2);
		assert_eq!(moon.parents[0], tides);
		assert!(song.parents.contains(&space));
		assert_eq!(gravity.mood, Mood::Sad);
		assert_eq!(moon.mood, Mood::Curious);
		assert!(nodes(&agents).iter().all(|n| n.opacity == 0.0 && !n.dying));

		let (_, ocean_node) = find(&agents, "OCEAN");
		assert!((ocean_node.anchor.x - 350.0).abs() < 1e-3);
		assert!((space_node.anchor.x + 350.0).abs() < 1e-3);
	}

	#[test]
	fn small_flocks_build_nothing() {
		let mut rng = SmallRng::seed_from_u64(12);
		let mut agents = flock(49, &mut rng);
		let mut overlay = GraphOverlay::default();
		let payload = GraphPayload::from_keywords(&["a".into(), "b".into()]);
		let built = overlay.rebuild(
			&mut agents,
			&payload,
			&GraphContext::default(),
			Mood::Neutral,
			50,
			&mut rng,
		);
		assert_eq!(built, 0);
		assert!(nodes(&agents).is_empty());
	}

	#[test]
	fn agents_always_outnumber_nodes() {
		let mut rng = SmallRng::seed_from_u64(13);
		let mut agents = flock(5, &mut rng);
		let mut overlay = GraphOverlay::default();
		let keywords: Vec<String> = (0..20).map(|i| format!("k{i}")).collect();
		let built = overlay.rebuild(
			&mut agents,
			&GraphPayload::from_keywords(&keywords),
			&GraphContext::default(),
			Mood::Neutral,
			1,
			&mut rng,
		);
		assert_eq!(built, 4);
		assert_eq!(agents.iter().filter(|a| a.is_free()).count(), 1);
	}

	#[test]
	fn dissolved_nodes_fade_then_detach() {
		let mut rng = SmallRng::seed_from_u64(14);
		let mut agents = flock(100, &mut rng);
		let mut overlay = GraphOverlay::default();
		let payload = GraphPayload::from_keywords(&["root".into(), "leafy".into()]);
		overlay.rebuild(
			&mut agents,
			&payload,
			&GraphContext::default(),
			Mood::Neutral,
			50,
			&mut rng,
		);
		for _ in 0..60 {
			overlay.advance_lifecycle(&mut agents);
		}
		assert!(nodes(&agents).iter().all(|n| n.opacity == 1.0));
		assert_eq!(overlay.legend(&agents).len(), 1);

		overlay.dissolve(&mut agents, &mut rng);
		assert!(nodes(&agents).iter().all(|n| n.dying));
		assert!(overlay.legend(&agents).is_empty());
		assert!(overlay.attractors(&agents).is_empty());

		// longest timer is under 140 frames, fade takes 40 more
		for _ in 0..200 {
			overlay.advance_lifecycle(&mut agents);
		}
		assert!(nodes(&agents).is_empty());
		assert!(overlay.active().is_empty());
	}

	#[test]
	fn rebuild_dissolves_previous_graph_and_stale_parents_are_ignored() {
		let mut rng = SmallRng::seed_from_u64(15);
		let mut agents = flock(100, &mut rng);
		let mut overlay = GraphOverlay::default();
		let ctx = GraphContext::default();
		overlay.rebuild(
			&mut agents,
			&GraphPayload::from_keywords(&["first".into(), "child".into()]),
			&ctx,
			Mood::Neutral,
			50,
			&mut rng,
		);
		let first_epoch = overlay.epoch();
		overlay.rebuild(
			&mut agents,
			&GraphPayload::from_keywords(&["second".into()]),
			&ctx,
			Mood::Neutral,
			50,
			&mut rng,
		);
		assert_eq!(overlay.active().len(), 1);
		let old: Vec<_> = nodes(&agents)
			.into_iter()
			.filter(|n| n.epoch == first_epoch)
			.collect();
		assert_eq!(old.len(), 2);
		assert!(old.iter().all(|n| n.dying));

		let (_, child) = find(&agents, "CHILD");
		assert!(overlay.live_parent(&agents, child).is_some());
		let (first, _) = find(&agents, "FIRST");
		agents[first.0].node = None;
		let (_, child) = find(&agents, "CHILD");
		assert!(overlay.live_parent(&agents, child).is_none());
	}

	#[test]
	fn clear_detaches_everything_at_once() {
		let mut rng = SmallRng::seed_from_u64(16);
		let mut agents = flock(60, &mut rng);
		let mut overlay = GraphOverlay::default();
		overlay.rebuild(
			&mut agents,
			&GraphPayload::from_keywords(&["x".into(), "y".into()]),
			&GraphContext::default(),
			Mood::Neutral,
			50,
			&mut rng,
		);
		overlay.clear(&mut agents);
		assert!(nodes(&agents).is_empty());
	}

	#[test]
	fn legend_sorts_by_share() {
		let mut rng = SmallRng::seed_from_u64(17);
		let mut agents = flock(100, &mut rng);
		let mut overlay = GraphOverlay::default();
		let payload = GraphPayload::parse(SAMPLE).unwrap();
		overlay.rebuild(
			&mut agents,
			&payload,
			&GraphContext::default(),
			Mood::Neutral,
			50,
			&mut rng,
		);
		let legend = overlay.legend(&agents);
		// CURIOUS: ocean tides moon whales song, JOYFUL: space, SAD: gravity
		assert_eq!(legend[0].mood, Mood::Curious);
		assert_eq!(legend[0].count, 5);
		assert!((legend.iter().map(|e| e.percent).sum::<f32>() - 100.0).abs() < 1e-3);
	}

	#[test]
	fn facts_use_each_memory_once() {
		let mut rng = SmallRng::seed_from_u64(18);
		let mut agents = flock(100, &mut rng);
		let mut overlay = GraphOverlay::default();
		let ctx = GraphContext::new(Vec::<String>::new(), vec![
			"[Date: 2024-01-01] the tide came in [Entities: sea]".into(),
			"nothing relevant".into(),
		]);
		overlay.rebuild(
			&mut agents,
			&GraphPayload::from_keywords(&["tide".into(), "tidepool".into()]),
			&ctx,
			Mood::Neutral,
			50,
			&mut rng,
		);
		let (_, tide) = find(&agents, "TIDE");
		assert_eq!(tide.fact.as_deref(), Some("The tide came in"));
		let (_, pool) = find(&agents, "TIDEPOOL");
		assert_eq!(pool.fact, None);
	}

	#[test]
	fn payload_memories_become_node_facts() {
		let mut rng = SmallRng::seed_from_u64(19);
		let mut agents = flock(100, &mut rng);
		let mut overlay = GraphOverlay::default();
		let payload = GraphPayload::parse(
			r#"{ "keywords": ["harbor", "lantern"],
			     "memories": ["[Entity: Home] the lantern by the harbor door", "the harbor froze in 1990"] }"#,
		)
		.unwrap();
		overlay.rebuild(
			&mut agents,
			&payload,
			&GraphContext::default(),
			Mood::Neutral,
			50,
			&mut rng,
		);
		let (_, harbor) = find(&agents, "HARBOR");
		assert_eq!(harbor.fact.as_deref(), Some("The lantern by the harbor door"));
		let (_, lantern) = find(&agents, "LANTERN");
		assert_eq!(lantern.fact, None);
	}

	#[test]
	fn blank_branch_label_falls_back_to_text() {
		let branch = BranchSpec {
			label: Some("  ".into()),
			text: Some("Reef".into()),
			..BranchSpec::default()
		};
		assert_eq!(branch.name(), Some("Reef"));
		let empty = BranchSpec {
			label: Some(String::new()),
			..BranchSpec::default()
		};
		assert_eq!(empty.name(), None);
	}

	#[test]
	fn dissolve_staggers_death_timers_by_level() {
		let mut rng = SmallRng::seed_from_u64(20);
		let mut agents = flock(200, &mut rng);
		let mut overlay = GraphOverlay::default();
		let payload = GraphPayload::parse(SAMPLE).unwrap();
		overlay.rebuild(
			&mut agents,
			&payload,
			&GraphContext::default(),
			Mood::Neutral,
			50,
			&mut rng,
		);
		overlay.dissolve(&mut agents, &mut rng);
		for node in nodes(&agents) {
			let range = match node.level {
				NodeLevel::Leaf => 0.0..40.0,
				NodeLevel::Branch => 40.0..90.0,
				NodeLevel::Root => 100.0..140.0,
			};
			assert!(range.contains(&node.death_timer), "{} {}", node.label, node.death_timer);
		}
	}

	#[test]
	fn new_nodes_fade_in_at_a_fiftieth_per_frame() {
		let mut rng = SmallRng::seed_from_u64(21);
		let mut agents = flock(60, &mut rng);
		let mut overlay = GraphOverlay::default();
		overlay.rebuild(
			&mut agents,
			&GraphPayload::from_keywords(&["dawn".into()]),
			&GraphContext::default(),
			Mood::Neutral,
			50,
			&mut rng,
		);
		for _ in 0..10 {
			overlay.advance_lifecycle(&mut agents);
		}
		let (_, dawn) = find(&agents, "DAWN");
		assert!((dawn.opacity - 0.2).abs() < 1e-4);
	}

	#[test]
	fn clean_fact_handles_unclosed_brackets() {
		assert_eq!(clean_fact("  [x] hello [unclosed"), "Hello [unclosed");
		assert_eq!(clean_fact("[only]"), "");
	}
}
