//! Placement of agents on the campus map.
//!
//! Coordinates are map units on an 820x600 plane with the origin at the top
//! left. The layout is a pure function of the agent sequence and the zone table.

use sim_proto::{Agent, AgentId};

pub const MAP_WIDTH: f32 = 820.0;
pub const MAP_HEIGHT: f32 = 600.0;
/// Distance between neighbouring agents inside a zone.
pub const GRID_SPACING: f32 = 22.0;
/// Where agents in unknown locations are drawn.
pub const FALLBACK_POINT: Point = Point { x: 400.0, y: 300.0 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.w / 2.0,
            y: self.y + self.h / 2.0,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.w
            && point.y >= self.y
            && point.y <= self.y + self.h
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: &'static str,
    pub bounds: Rect,
}

const fn zone(id: &'static str, name: &'static str, kind: &'static str, bounds: Rect) -> Zone {
    Zone {
        id,
        name,
        kind,
        bounds,
    }
}

pub const CAMPUS_ZONES: [Zone; 13] = [
    zone("classroom_math", "Math", "Classroom", Rect::new(200.0, 100.0, 100.0, 70.0)),
    zone("classroom_chinese", "Chinese", "Classroom", Rect::new(350.0, 100.0, 100.0, 70.0)),
    zone("classroom_english", "English", "Classroom", Rect::new(500.0, 100.0, 100.0, 70.0)),
    zone("classroom_science", "Lab", "Classroom", Rect::new(200.0, 200.0, 100.0, 70.0)),
    zone("library", "Library", "Library", Rect::new(650.0, 130.0, 110.0, 80.0)),
    zone("study_room", "Study Room", "StudyRoom", Rect::new(650.0, 240.0, 90.0, 60.0)),
    zone("playground", "Playground", "Playground", Rect::new(350.0, 370.0, 160.0, 110.0)),
    zone("cafeteria", "Cafeteria", "Cafeteria", Rect::new(170.0, 370.0, 120.0, 90.0)),
    zone("dormitory", "Dormitory", "Dormitory", Rect::new(60.0, 470.0, 130.0, 80.0)),
    zone("club_room", "Club Room", "ClubRoom", Rect::new(500.0, 280.0, 100.0, 65.0)),
    zone("auditorium", "Auditorium", "Auditorium", Rect::new(640.0, 340.0, 120.0, 80.0)),
    zone("rest_area", "Rest Area", "RestArea", Rect::new(350.0, 275.0, 90.0, 60.0)),
    zone("hallway", "Hallway", "RestArea", Rect::new(300.0, 190.0, 140.0, 50.0)),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub agent_id: AgentId,
    /// `None` when the agent's location is not in the zone table.
    pub zone: Option<&'static str>,
    pub point: Point,
}

/// Connector between two agents socializing in the same location.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialLink {
    pub a: AgentId,
    pub b: AgentId,
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CampusLayout {
    /// One entry per agent, in input order.
    pub placements: Vec<Placement>,
    pub links: Vec<SocialLink>,
    /// Occupant count per known zone, in zone table order. Empty zones are
    /// omitted.
    pub occupancy: Vec<(&'static str, usize)>,
}

impl CampusLayout {
    pub fn placement(&self, agent_id: &str) -> Option<&Placement> {
        self.placements
            .iter()
            .find(|placement| placement.agent_id == agent_id)
    }

    pub fn occupancy_of(&self, zone_id: &str) -> usize {
        self.occupancy
            .iter()
            .find(|(id, _)| *id == zone_id)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

pub fn zone_at(zones: &[Zone], point: Point) -> Option<&Zone> {
    zones.iter().find(|zone| zone.bounds.contains(point))
}

fn ceil_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root < n {
        root += 1;
    }
    while root > 0 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root
}

/// Position of occupant `index` out of `count` around `center`.
pub fn grid_position(center: Point, index: usize, count: usize) -> Point {
    if count <= 1 {
        return center;
    }
    let columns = ceil_sqrt(count);
    let rows = count.div_ceil(columns);
    let row = index / columns;
    let col = index % columns;
    let start_x = center.x - (columns - 1) as f32 * GRID_SPACING / 2.0;
    let start_y = center.y - (rows - 1) as f32 * GRID_SPACING / 2.0;
    Point {
        x: start_x + col as f32 * GRID_SPACING,
        y: start_y + row as f32 * GRID_SPACING,
    }
}

pub fn compute_layout(agents: &[Agent], zones: &[Zone]) -> CampusLayout {
    // Groups keep first-appearance order; members keep input order.
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for (index, agent) in agents.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|(location, _)| *location == agent.location.as_str())
        {
            Some((_, members)) => members.push(index),
            None => groups.push((agent.location.as_str(), vec![index])),
        }
    }

    let mut points: Vec<Option<(Option<&'static str>, Point)>> = vec![None; agents.len()];
    let mut links = Vec::new();

    for (location, members) in &groups {
        let zone = zones.iter().find(|zone| zone.id == *location);
        let count = members.len();
        let position = |slot: usize| match zone {
            Some(zone) => grid_position(zone.bounds.center(), slot, count),
            None => FALLBACK_POINT,
        };

        for (slot, &agent_index) in members.iter().enumerate() {
            points[agent_index] = Some((zone.map(|zone| zone.id), position(slot)));
        }

        let social: Vec<(usize, usize)> = members
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, agent_index)| agents[agent_index].activity.is_social())
            .collect();
        for pair in social.chunks_exact(2) {
            let (slot_a, a) = pair[0];
            let (slot_b, b) = pair[1];
            links.push(SocialLink {
                a: agents[a].id.clone(),
                b: agents[b].id.clone(),
                from: position(slot_a),
                to: position(slot_b),
            });
        }
    }

    let placements = agents
        .iter()
        .zip(points)
        .map(|(agent, point)| {
            let (zone, point) = point.unwrap_or((None, FALLBACK_POINT));
            Placement {
                agent_id: agent.id.clone(),
                zone,
                point,
            }
        })
        .collect();

    let occupancy = zones
        .iter()
        .filter_map(|zone| {
            groups
                .iter()
                .find(|(location, _)| *location == zone.id)
                .map(|(_, members)| (zone.id, members.len()))
        })
        .collect();

    CampusLayout {
        placements,
        links,
        occupancy,
    }
}
