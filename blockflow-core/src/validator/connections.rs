//! Connection integrity: endpoints exist, port types are compatible, and
//! every required input is fed.

use std::collections::HashSet;

use crate::domain::{BlockId, PortId, Strategy};

use super::result::{Findings, ValidationCode, ValidationError};

pub(crate) fn check(strategy: &Strategy, findings: &mut Findings) {
    for c in &strategy.connections {
        let source = strategy.block(&c.source_block_id);
        let target = strategy.block(&c.target_block_id);

        if source.is_none() {
            findings.push(
                ValidationError::error(
                    ValidationCode::UnknownSourceBlock,
                    format!("connection source block '{}' does not exist", c.source_block_id),
                )
                .on_connection(&c.id),
            );
        }
        if target.is_none() {
            findings.push(
                ValidationError::error(
                    ValidationCode::UnknownTargetBlock,
                    format!("connection target block '{}' does not exist", c.target_block_id),
                )
                .on_connection(&c.id),
            );
        }
        let (Some(source), Some(target)) = (source, target) else {
            continue;
        };

        let out_port = source.output(&c.source_port_id);
        let in_port = target.input(&c.target_port_id);
        if out_port.is_none() {
            findings.push(
                ValidationError::error(
                    ValidationCode::UnknownSourcePort,
                    format!(
                        "block '{}' has no output port '{}'",
                        source.id, c.source_port_id
                    ),
                )
                .on_connection(&c.id)
                .on_block(&source.id),
            );
        }
        if in_port.is_none() {
            findings.push(
                ValidationError::error(
                    ValidationCode::UnknownTargetPort,
                    format!(
                        "block '{}' has no input port '{}'",
                        target.id, c.target_port_id
                    ),
                )
                .on_connection(&c.id)
                .on_block(&target.id),
            );
        }
        let (Some(out_port), Some(in_port)) = (out_port, in_port) else {
            continue;
        };

        if !out_port.data_type.flows_into(in_port.data_type) {
            findings.push(
                ValidationError::error(
                    ValidationCode::TypeMismatch,
                    format!(
                        "cannot connect {:?} output '{}.{}' to {:?} input '{}.{}'",
                        out_port.data_type,
                        source.id,
                        out_port.id,
                        in_port.data_type,
                        target.id,
                        in_port.id
                    ),
                )
                .on_connection(&c.id),
            );
        }
    }

    let fed: HashSet<(&BlockId, &PortId)> = strategy
        .connections
        .iter()
        .map(|c| (&c.target_block_id, &c.target_port_id))
        .collect();

    for block in strategy.blocks.iter().filter(|b| !b.is_trigger()) {
        for port in block.inputs.iter().filter(|p| p.required) {
            if !fed.contains(&(&block.id, &port.id)) {
                findings.push(
                    ValidationError::error(
                        ValidationCode::MissingRequiredInput,
                        format!(
                            "required input '{}' of block '{}' is not connected",
                            port.name, block.name
                        ),
                    )
                    .on_block(&block.id)
                    .on_field(port.id.as_str()),
                );
            }
        }
    }
}
