// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::component::{Component, Connection};
use super::frame::{Bounds, Frame};
use super::ids::{ComponentId, ConnectionId, FrameId};
use super::snapshot::Snapshot;

fn cid(value: &str) -> ComponentId {
    ComponentId::new(value).expect("component id")
}

fn conn(id: &str, from: &str, to: &str) -> Connection {
    Connection::new(
        ConnectionId::new(id).expect("connection id"),
        cid(from),
        cid(to),
    )
}

/// `web -> api -> db`, with `api` and `db` grouped in a `backend` frame.
pub(crate) fn three_tier() -> Snapshot {
    let backend = FrameId::new("backend").expect("frame id");

    let web = Component::new(cid("web"), "frontend", 0.0, 0.0).with_label("Web");
    let mut api = Component::new(cid("api"), "api", 300.0, 0.0).with_label("API");
    let mut db = Component::new(cid("db"), "database", 600.0, 0.0).with_label("DB");
    api.parent_frame_id = Some(backend.clone());
    db.parent_frame_id = Some(backend.clone());

    let mut frame = Frame::new(backend, "Backend", Bounds::new(268.0, -32.0, 524.0, 160.0));
    frame.component_ids.insert(cid("api"));
    frame.component_ids.insert(cid("db"));

    Snapshot {
        components: vec![web, api, db],
        connections: vec![conn("web-api", "web", "api"), conn("api-db", "api", "db")],
        frames: vec![frame],
        ..Snapshot::default()
    }
}

/// Two unframed components joined by a single edge.
pub(crate) fn pair() -> Snapshot {
    Snapshot {
        components: vec![
            Component::new(cid("a"), "service", 0.0, 0.0),
            Component::new(cid("b"), "service", 300.0, 300.0),
        ],
        connections: vec![conn("a-b", "a", "b")],
        ..Snapshot::default()
    }
}
