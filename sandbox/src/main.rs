// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Scenery Sandbox
// Builds a small scene, animates it for a few frames and picks the canvas center.

use anyhow::{Context, Result};
use glam::Vec3;
use scenery_agents::render_agent::RenderAgent;
use scenery_core::scene::{NodeId, SceneId};
use scenery_core::EngineSettings;
use scenery_data::scene::CameraData;
use scenery_data::state::{GeometryData, Light, LightsState, MaterialState};
use scenery_data::{AttrValue, NodeData};
use scenery_infra::SoftwareDevice;
use std::sync::Arc;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;
const FRAMES: u32 = 8;

fn load_settings() -> Result<EngineSettings> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Reading settings from {path}"))?;
            EngineSettings::from_ron(&text).with_context(|| format!("Parsing {path}"))
        }
        None => Ok(EngineSettings::default()),
    }
}

/// Adds `parent -> Translate -> Material -> Name -> Geometry` and returns the
/// translate node.
fn add_quad(
    agent: &mut RenderAgent,
    scene: SceneId,
    parent: NodeId,
    name: &str,
    offset: Vec3,
    color: Vec3,
) -> Result<NodeId> {
    let translate = agent.add_node(scene, parent, NodeData::Translate(offset))?;
    let material = agent.add_node(
        scene,
        translate,
        NodeData::Material(MaterialState {
            base_color: color,
            ..Default::default()
        }),
    )?;
    let named = agent.add_node(scene, material, NodeData::Name(name.to_string()))?;
    agent.add_node(
        scene,
        named,
        NodeData::Geometry(Arc::new(GeometryData::quad(1.5))),
    )?;
    Ok(translate)
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = load_settings()?;
    let mut agent = RenderAgent::new(Box::new(SoftwareDevice::new(WIDTH, HEIGHT)), settings);
    let scene = agent.create_scene();
    let root = agent.root(scene)?;

    let camera = agent.add_node(
        scene,
        root,
        NodeData::Camera(CameraData {
            aspect: WIDTH as f32 / HEIGHT as f32,
            ..Default::default()
        }),
    )?;
    let view = agent.add_node(
        scene,
        camera,
        NodeData::LookAt {
            eye: Vec3::new(0.0, 0.0, 10.0),
            look: Vec3::ZERO,
            up: Vec3::Y,
        },
    )?;
    let lights = agent.add_node(
        scene,
        view,
        NodeData::Lights(LightsState {
            ambient: Vec3::splat(0.3),
            lights: vec![Light::directional(Vec3::new(0.0, -0.5, -1.0))],
        }),
    )?;
    let left = add_quad(&mut agent, scene, lights, "left", Vec3::new(-2.0, 0.0, 0.0), Vec3::X)?;
    add_quad(&mut agent, scene, lights, "right", Vec3::new(2.0, 0.0, 0.0), Vec3::Z)?;

    for frame in 0..FRAMES {
        let y = (frame as f32 * 0.5).sin();
        let level = agent.set_attribute(scene, left, "y", None, AttrValue::Float(y))?;
        let stats = agent.render_frame(scene)?;
        log::info!(
            "Frame {}: {:?} ({level:?}), {} draws, {} built, {} replayed, {:?}",
            stats.frame_number,
            stats.pass_level,
            stats.draw_calls,
            stats.commands_built,
            stats.commands_replayed,
            stats.frame_time
        );
    }

    for (x, y) in [(WIDTH / 2 - 32, HEIGHT / 2), (WIDTH / 2 + 32, HEIGHT / 2), (4, 4)] {
        match agent.pick(scene, x, y, true)? {
            Some(hit) => log::info!("Pick ({x}, {y}): '{}' at {:?}", hit.name, hit.world_pos),
            None => log::info!("Pick ({x}, {y}): nothing"),
        }
    }

    for event in agent.events().drain() {
        log::debug!("{event:?}");
    }
    agent.destroy_scene(scene)?;
    Ok(())
}
