//! Parser for the command text encoding → `Command`.
//!
//! Built on `winnow` 0.7. One command per line; the first token is the tag.
//! Blank lines and `#` comment lines are skipped by `decode`.

use crate::command::Command;
use crate::id::EntityName;
use crate::model::*;
use thiserror::Error;
use winnow::ascii::{dec_int, dec_uint, float, space1};
use winnow::combinator::{alt, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{any, take_till};

/// Malformed command text. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct DecodeError {
    pub line: usize,
    pub message: String,
}

impl DecodeError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Decode every command in `text`, one per line.
#[must_use = "decoding result should be used"]
pub fn decode(text: &str) -> Result<Vec<Command>, DecodeError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(idx, line)| decode_at(line, idx + 1))
        .collect()
}

/// Decode a single command line.
pub fn decode_line(line: &str) -> Result<Command, DecodeError> {
    decode_at(line, 1)
}

fn decode_at(line: &str, line_no: usize) -> Result<Command, DecodeError> {
    let trimmed = line.trim();
    let tag_end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let (tag, mut rest) = trimmed.split_at(tag_end);

    let parsed = match tag {
        "ADDEDOBJECT" => added_object.parse_next(&mut rest),
        "DELETEDOBJECT" => deleted_object.parse_next(&mut rest),
        "ADDEDCONNECTOR" => connector.map(Command::AddConnector).parse_next(&mut rest),
        "DELETEDCONNECTOR" => connector.map(Command::DeleteConnector).parse_next(&mut rest),
        "RENAMEDOBJECT" => renamed_object.parse_next(&mut rest),
        "MOVEDOBJECT" => moved_object.parse_next(&mut rest),
        "ROTATEDOBJECT" => rotated_object.parse_next(&mut rest),
        "VERTICALFLIP" => entity.map(|name| Command::FlipVertical { name }).parse_next(&mut rest),
        "HORIZONTALFLIP" => entity.map(|name| Command::FlipHorizontal { name }).parse_next(&mut rest),
        "PARAMETER" => changed_parameter.parse_next(&mut rest),
        "NAMEVISIBILITY" => flag_change
            .map(|(entity, old, new)| Command::ChangedNameVisibility { entity, old, new })
            .parse_next(&mut rest),
        "ALWAYSVISIBLE" => flag_change
            .map(|(entity, old, new)| Command::ChangedAlwaysVisible { entity, old, new })
            .parse_next(&mut rest),
        "MOVEDCONNECTOR" => moved_connector.parse_next(&mut rest),
        "MODIFIEDCONNECTOR" => modified_connector.parse_next(&mut rest),
        "" => return Err(DecodeError::new(line_no, "empty command line")),
        other => return Err(DecodeError::new(line_no, format!("unknown command tag `{other}`"))),
    };

    let command = parsed.map_err(|_| DecodeError::new(line_no, format!("malformed `{tag}` command")))?;
    if !rest.trim().is_empty() {
        return Err(DecodeError::new(
            line_no,
            format!("unexpected trailing input `{}`", rest.trim()),
        ));
    }
    Ok(command)
}

// ─── Command bodies ─────────────────────────────────────────────────────

fn added_object(input: &mut &str) -> ModalResult<Command> {
    let type_name = text(input)?;
    let name = entity(input)?;
    let position = point(input)?;
    let rotation = rotation(input)?;
    let name_visible = flag(input)?;
    Ok(Command::AddEntity {
        type_name,
        name,
        position,
        rotation,
        name_visible,
    })
}

fn deleted_object(input: &mut &str) -> ModalResult<Command> {
    let type_name = text(input)?;
    let name = entity(input)?;
    let position = point(input)?;
    let rotation = rotation(input)?;
    let horizontal = flag(input)?;
    let vertical = flag(input)?;
    let name_visible = flag(input)?;
    let always_visible = flag(input)?;
    let parameters: Vec<Parameter> = repeat(0.., (text, text).map(|(name, value)| Parameter { name, value }))
        .parse_next(input)?;
    Ok(Command::DeleteEntity {
        snapshot: EntitySnapshot {
            type_name,
            name,
            pose: Pose {
                position,
                rotation,
                flip: Flip { horizontal, vertical },
            },
            name_visible,
            always_visible,
            parameters,
        },
    })
}

fn connector(input: &mut &str) -> ModalResult<ConnectorSpec> {
    let start = port_ref(input)?;
    let end = port_ref(input)?;
    let waypoints: Vec<Point> = repeat(0.., point).parse_next(input)?;
    Ok(ConnectorSpec { start, end, waypoints })
}

fn renamed_object(input: &mut &str) -> ModalResult<Command> {
    let old = entity(input)?;
    let new = entity(input)?;
    Ok(Command::RenameEntity { old, new })
}

fn moved_object(input: &mut &str) -> ModalResult<Command> {
    let name = entity(input)?;
    let old = point(input)?;
    let new = point(input)?;
    Ok(Command::MoveEntity { name, old, new })
}

fn rotated_object(input: &mut &str) -> ModalResult<Command> {
    let name = entity(input)?;
    let old = rotation(input)?;
    let new = rotation(input)?;
    Ok(Command::RotateEntity { name, old, new })
}

fn changed_parameter(input: &mut &str) -> ModalResult<Command> {
    let entity = entity(input)?;
    let parameter = text(input)?;
    let old = text(input)?;
    let new = text(input)?;
    Ok(Command::ChangedParameter {
        entity,
        parameter,
        old,
        new,
    })
}

fn flag_change(input: &mut &str) -> ModalResult<(EntityName, bool, bool)> {
    let entity = entity(input)?;
    let old = flag(input)?;
    let new = flag(input)?;
    Ok((entity, old, new))
}

fn moved_connector(input: &mut &str) -> ModalResult<Command> {
    let start = port_ref(input)?;
    let end = port_ref(input)?;
    let dx = number(input)?;
    let dy = number(input)?;
    Ok(Command::MoveConnector { start, end, dx, dy })
}

fn modified_connector(input: &mut &str) -> ModalResult<Command> {
    let start = port_ref(input)?;
    let end = port_ref(input)?;
    let line = preceded(space1, dec_uint).parse_next(input)?;
    let old = point(input)?;
    let new = point(input)?;
    Ok(Command::ModifiedConnector {
        start,
        end,
        line,
        old,
        new,
    })
}

// ─── Fields (each consumes its leading whitespace) ──────────────────────

/// A quoted string with `\"`, `\\`, `\n` and `\r` escapes.
fn text(input: &mut &str) -> ModalResult<String> {
    open_quote(input)?;
    let mut out = String::new();
    loop {
        out.push_str(unescaped(input)?);
        match next_char(input)? {
            '"' => return Ok(out),
            _ => out.push(match next_char(input)? {
                'n' => '\n',
                'r' => '\r',
                other => other,
            }),
        }
    }
}

fn open_quote(input: &mut &str) -> ModalResult<()> {
    (space1, '"').void().parse_next(input)
}

fn unescaped<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_till(0.., ['"', '\\']).parse_next(input)
}

fn next_char(input: &mut &str) -> ModalResult<char> {
    any.parse_next(input)
}

fn entity(input: &mut &str) -> ModalResult<EntityName> {
    text.map(|s| EntityName::intern(&s)).parse_next(input)
}

fn port_ref(input: &mut &str) -> ModalResult<PortRef> {
    let entity = entity(input)?;
    let port = text(input)?;
    Ok(PortRef { entity, port })
}

fn number(input: &mut &str) -> ModalResult<f64> {
    preceded(space1, float).parse_next(input)
}

fn point(input: &mut &str) -> ModalResult<Point> {
    let x = number(input)?;
    let y = number(input)?;
    Ok(Point::new(x, y))
}

fn rotation(input: &mut &str) -> ModalResult<Rotation> {
    preceded(space1, dec_int.verify_map(Rotation::from_degrees)).parse_next(input)
}

fn flag(input: &mut &str) -> ModalResult<bool> {
    preceded(space1, alt(('0'.value(false), '1'.value(true)))).parse_next(input)
}
