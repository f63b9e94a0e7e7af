// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of ArchiComm and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Grid slot for the `ordinal`-th component added without explicit coordinates.
pub fn grid_slot(ordinal: usize) -> (f64, f64) {
    let column = ordinal % GRID_COLUMNS;
    let row = ordinal / GRID_COLUMNS;
    (
        GRID_ORIGIN.0 + column as f64 * GRID_SPACING_X,
        GRID_ORIGIN.1 + row as f64 * GRID_SPACING_Y,
    )
}

fn parse_layer(index: usize, raw: &str, result: &mut InstructionBatchResult) -> Option<LayerId> {
    match LayerId::new(raw) {
        Ok(layer_id) => Some(layer_id),
        Err(_) => {
            result.warnings.push(BatchWarning::InvalidField {
                index,
                field: "layerId",
                value: raw.to_owned(),
            });
            None
        }
    }
}

impl WorkingSet {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            components: snapshot
                .components
                .iter()
                .map(|c| (c.id.clone(), c.clone()))
                .collect(),
            connections: snapshot
                .connections
                .iter()
                .map(|c| (c.id.clone(), c.clone()))
                .collect(),
            frames: snapshot.frames.clone(),
            component_aliases: HashMap::new(),
            connection_aliases: HashMap::new(),
            placed_components: 0,
        }
    }

    fn into_snapshot(self, base: &Snapshot) -> Snapshot {
        Snapshot {
            components: self.components.into_values().collect(),
            connections: self.connections.into_values().collect(),
            frames: self.frames,
            layers: base.layers.clone(),
            selection: base.selection.clone(),
            active_tool: base.active_tool,
            grid_config: base.grid_config,
        }
    }

    /// Alias first, then literal id. Aliases whose entity was removed no longer resolve.
    fn resolve_component(&self, reference: &str) -> Option<ComponentId> {
        if let Some(id) = self.component_aliases.get(reference) {
            if self.components.contains_key(id) {
                return Some(id.clone());
            }
        }
        self.components
            .get_key_value(reference)
            .map(|(id, _)| id.clone())
    }

    fn resolve_connection(&self, reference: &str) -> Option<ConnectionId> {
        if let Some(id) = self.connection_aliases.get(reference) {
            if self.connections.contains_key(id) {
                return Some(id.clone());
            }
        }
        self.connections
            .get_key_value(reference)
            .map(|(id, _)| id.clone())
    }

    fn require_component(&self, reference: &str) -> Result<ComponentId, MissingRef> {
        self.resolve_component(reference).ok_or_else(|| MissingRef {
            kind: EntityKind::Component,
            reference: reference.to_owned(),
        })
    }

    fn require_connection(&self, reference: &str) -> Result<ConnectionId, MissingRef> {
        self.resolve_connection(reference).ok_or_else(|| MissingRef {
            kind: EntityKind::Connection,
            reference: reference.to_owned(),
        })
    }

    fn apply(
        &mut self,
        index: usize,
        instruction: &Instruction,
        allocator: &mut dyn IdAllocator,
        result: &mut InstructionBatchResult,
    ) -> Step {
        let outcome = match instruction {
            Instruction::AddComponent(add) => {
                self.add_component(index, add, allocator, result);
                Ok(())
            }
            Instruction::UpdateComponent(update) => self.update_component(index, update, result),
            Instruction::RemoveComponent(target) => self.remove_component(&target.id, result),
            Instruction::AddConnection(add) => self.add_connection(index, add, allocator, result),
            Instruction::UpdateConnection(update) => self.update_connection(update, result),
            Instruction::RemoveConnection(target) => self.remove_connection(&target.id, result),
            Instruction::Annotate(annotate) => {
                result.annotations += 1;
                result.warnings.push(BatchWarning::AnnotationIgnored {
                    index,
                    target: annotate.target.clone(),
                });
                Ok(())
            }
            Instruction::Unknown { tag } => {
                result.skipped += 1;
                result.warnings.push(BatchWarning::UnknownInstruction {
                    index,
                    tag: tag.clone(),
                });
                Ok(())
            }
            Instruction::Malformed { tag, reason } => {
                result.skipped += 1;
                result.warnings.push(BatchWarning::MalformedInstruction {
                    index,
                    tag: tag.clone(),
                    reason: reason.clone(),
                });
                Ok(())
            }
        };

        match outcome {
            Ok(()) => Step::Done,
            Err(missing) => Step::Deferred(missing),
        }
    }

    fn add_component(
        &mut self,
        index: usize,
        add: &AddComponent,
        allocator: &mut dyn IdAllocator,
        result: &mut InstructionBatchResult,
    ) {
        let (grid_x, grid_y) = grid_slot(self.placed_components);
        self.placed_components += 1;

        let components = &self.components;
        let id: ComponentId = allocate_id(allocator, EntityKind::Component, &|candidate| {
            components.contains_key(candidate)
        });

        let mut component = Component::new(
            id.clone(),
            SmolStr::new(&add.component_type),
            add.x.unwrap_or(grid_x),
            add.y.unwrap_or(grid_y),
        );
        component.width = add.width.unwrap_or(DEFAULT_COMPONENT_WIDTH);
        component.height = add.height.unwrap_or(DEFAULT_COMPONENT_HEIGHT);
        component.label = add
            .label
            .clone()
            .unwrap_or_else(|| add.component_type.clone());
        component.properties = add.properties.clone();
        if let Some(raw) = &add.layer_id {
            component.layer_id = parse_layer(index, raw, result);
        }

        self.components.insert(id.clone(), component);
        result.added_components += 1;

        if let Some(alias) = &add.id {
            if self
                .component_aliases
                .insert(alias.clone(), id.clone())
                .is_some()
            {
                result.warnings.push(BatchWarning::AliasRebound {
                    index,
                    alias: alias.clone(),
                });
            }
            result.alias_map.insert(alias.clone(), id.into_string());
        }
    }

    fn update_component(
        &mut self,
        index: usize,
        update: &UpdateComponent,
        result: &mut InstructionBatchResult,
    ) -> Result<(), MissingRef> {
        let id = self.require_component(&update.id)?;
        let Some(component) = self.components.get_mut(&id) else {
            return Err(MissingRef {
                kind: EntityKind::Component,
                reference: update.id.clone(),
            });
        };

        let patch = &update.patch;
        if let Some(component_type) = &patch.component_type {
            component.component_type = SmolStr::new(component_type);
        }
        if let Some(x) = patch.x {
            component.x = x;
        }
        if let Some(y) = patch.y {
            component.y = y;
        }
        if let Some(width) = patch.width {
            component.width = width;
        }
        if let Some(height) = patch.height {
            component.height = height;
        }
        if let Some(label) = &patch.label {
            component.label = label.clone();
        }
        if let Some(properties) = &patch.properties {
            for (key, value) in properties {
                component.properties.insert(key.clone(), value.clone());
            }
        }
        if let Some(raw) = &patch.layer_id {
            if let Some(layer_id) = parse_layer(index, raw, result) {
                component.layer_id = Some(layer_id);
            }
        }

        result.updated_components += 1;
        Ok(())
    }

    fn remove_component(
        &mut self,
        reference: &str,
        result: &mut InstructionBatchResult,
    ) -> Result<(), MissingRef> {
        let id = self.require_component(reference)?;
        self.components.shift_remove(&id);

        let before = self.connections.len();
        self.connections.retain(|_, conn| !conn.touches(&id));
        let cascaded = before - self.connections.len();

        for frame in &mut self.frames {
            frame.component_ids.remove(&id);
        }

        result.removed_components += 1;
        result.removed_connections += cascaded;
        result.cascade_removed_connections += cascaded;
        Ok(())
    }

    fn add_connection(
        &mut self,
        index: usize,
        add: &AddConnection,
        allocator: &mut dyn IdAllocator,
        result: &mut InstructionBatchResult,
    ) -> Result<(), MissingRef> {
        let from = self.require_component(&add.from)?;
        let to = self.require_component(&add.to)?;

        let connections = &self.connections;
        let id: ConnectionId = allocate_id(allocator, EntityKind::Connection, &|candidate| {
            connections.contains_key(candidate)
        });

        let mut connection = Connection::new(id.clone(), from, to);
        connection.connection_type = SmolStr::new(
            add.connection_type
                .as_deref()
                .unwrap_or(DEFAULT_CONNECTION_TYPE),
        );
        connection.label = add.label.clone();
        connection.protocol = add.protocol.clone();
        connection.direction = add.direction;

        self.connections.insert(id.clone(), connection);
        result.added_connections += 1;

        if let Some(alias) = &add.id {
            if self
                .connection_aliases
                .insert(alias.clone(), id.clone())
                .is_some()
            {
                result.warnings.push(BatchWarning::AliasRebound {
                    index,
                    alias: alias.clone(),
                });
            }
            result.alias_map.insert(alias.clone(), id.into_string());
        }
        Ok(())
    }

    fn update_connection(
        &mut self,
        update: &UpdateConnection,
        result: &mut InstructionBatchResult,
    ) -> Result<(), MissingRef> {
        let id = self.require_connection(&update.id)?;
        let patch = &update.patch;
        let from = patch
            .from
            .as_deref()
            .map(|reference| self.require_component(reference))
            .transpose()?;
        let to = patch
            .to
            .as_deref()
            .map(|reference| self.require_component(reference))
            .transpose()?;

        let Some(connection) = self.connections.get_mut(&id) else {
            return Err(MissingRef {
                kind: EntityKind::Connection,
                reference: update.id.clone(),
            });
        };

        if let Some(from) = from {
            connection.from = from;
        }
        if let Some(to) = to {
            connection.to = to;
        }
        if let Some(connection_type) = &patch.connection_type {
            connection.connection_type = SmolStr::new(connection_type);
        }
        if let Some(label) = &patch.label {
            connection.label = Some(label.clone());
        }
        if let Some(protocol) = &patch.protocol {
            connection.protocol = Some(protocol.clone());
        }
        if let Some(direction) = patch.direction {
            connection.direction = Some(direction);
        }

        result.updated_connections += 1;
        Ok(())
    }

    fn remove_connection(
        &mut self,
        reference: &str,
        result: &mut InstructionBatchResult,
    ) -> Result<(), MissingRef> {
        let id = self.require_connection(reference)?;
        self.connections.shift_remove(&id);
        result.removed_connections += 1;
        Ok(())
    }
}
