//! Emitter: Command → one line of text.
//!
//! Numbers are written with 6 significant digits (`%g` style), booleans as
//! `0`/`1`, rotations as integer degrees, strings quoted with `"` and `\`
//! escaped and line breaks written as `\n`/`\r`, so every command stays on
//! one line. Output round-trips through `parser::decode_line`.

use crate::command::Command;
use crate::model::*;
use std::fmt::Write;

/// Encode a single command (no trailing newline).
#[must_use]
pub fn encode(command: &Command) -> String {
    let mut out = String::with_capacity(64);
    out.push_str(command.tag());

    match command {
        Command::AddEntity {
            type_name,
            name,
            position,
            rotation,
            name_visible,
        } => {
            push_str(&mut out, type_name);
            push_str(&mut out, name.as_str());
            push_point(&mut out, *position);
            push_rotation(&mut out, *rotation);
            push_flag(&mut out, *name_visible);
        }
        Command::DeleteEntity { snapshot } => {
            push_str(&mut out, &snapshot.type_name);
            push_str(&mut out, snapshot.name.as_str());
            push_point(&mut out, snapshot.pose.position);
            push_rotation(&mut out, snapshot.pose.rotation);
            push_flag(&mut out, snapshot.pose.flip.horizontal);
            push_flag(&mut out, snapshot.pose.flip.vertical);
            push_flag(&mut out, snapshot.name_visible);
            push_flag(&mut out, snapshot.always_visible);
            for param in &snapshot.parameters {
                push_str(&mut out, &param.name);
                push_str(&mut out, &param.value);
            }
        }
        Command::AddConnector(spec) | Command::DeleteConnector(spec) => {
            push_port(&mut out, &spec.start);
            push_port(&mut out, &spec.end);
            for point in &spec.waypoints {
                push_point(&mut out, *point);
            }
        }
        Command::RenameEntity { old, new } => {
            push_str(&mut out, old.as_str());
            push_str(&mut out, new.as_str());
        }
        Command::MoveEntity { name, old, new } => {
            push_str(&mut out, name.as_str());
            push_point(&mut out, *old);
            push_point(&mut out, *new);
        }
        Command::RotateEntity { name, old, new } => {
            push_str(&mut out, name.as_str());
            push_rotation(&mut out, *old);
            push_rotation(&mut out, *new);
        }
        Command::FlipVertical { name } | Command::FlipHorizontal { name } => {
            push_str(&mut out, name.as_str());
        }
        Command::ChangedParameter {
            entity,
            parameter,
            old,
            new,
        } => {
            push_str(&mut out, entity.as_str());
            push_str(&mut out, parameter);
            push_str(&mut out, old);
            push_str(&mut out, new);
        }
        Command::ChangedNameVisibility { entity, old, new }
        | Command::ChangedAlwaysVisible { entity, old, new } => {
            push_str(&mut out, entity.as_str());
            push_flag(&mut out, *old);
            push_flag(&mut out, *new);
        }
        Command::MoveConnector { start, end, dx, dy } => {
            push_port(&mut out, start);
            push_port(&mut out, end);
            push_num(&mut out, *dx);
            push_num(&mut out, *dy);
        }
        Command::ModifiedConnector {
            start,
            end,
            line,
            old,
            new,
        } => {
            push_port(&mut out, start);
            push_port(&mut out, end);
            let _ = write!(out, " {line}");
            push_point(&mut out, *old);
            push_point(&mut out, *new);
        }
    }

    out
}

/// Encode commands one per line, each terminated by `\n`.
#[must_use]
pub fn encode_all<'a>(commands: impl IntoIterator<Item = &'a Command>) -> String {
    let mut out = String::new();
    for command in commands {
        out.push_str(&encode(command));
        out.push('\n');
    }
    out
}

// ─── Fields ──────────────────────────────────────────────────────────────

fn push_str(out: &mut String, s: &str) {
    out.push_str(" \"");
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn push_num(out: &mut String, n: f64) {
    let _ = write!(out, " {}", format_num(n));
}

fn push_point(out: &mut String, p: Point) {
    push_num(out, p.x);
    push_num(out, p.y);
}

fn push_rotation(out: &mut String, r: Rotation) {
    let _ = write!(out, " {}", r.degrees());
}

fn push_flag(out: &mut String, b: bool) {
    out.push_str(if b { " 1" } else { " 0" });
}

fn push_port(out: &mut String, port: &PortRef) {
    push_str(out, port.entity.as_str());
    push_str(out, &port.port);
}

/// Format with 6 significant digits: fixed notation for exponents in
/// `-4..6`, otherwise `d.ddddde±XX`. Trailing zeros are dropped.
pub fn format_num(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if !n.is_finite() {
        return n.to_string();
    }

    // Round to 6 significant digits first so the exponent reflects carries.
    let sci = format!("{n:.5e}");
    let Some((mantissa, exp)) = sci.split_once('e').and_then(|(m, e)| Some((m, e.parse::<i32>().ok()?))) else {
        return n.to_string();
    };

    if (-4..6).contains(&exp) {
        let decimals = (5 - exp).max(0) as usize;
        trim_fraction(&format!("{n:.decimals$}"))
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    }
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityName;

    #[test]
    fn numbers_use_six_significant_digits() {
        assert_eq!(format_num(0.0), "0");
        assert_eq!(format_num(-0.0), "0");
        assert_eq!(format_num(100.0), "100");
        assert_eq!(format_num(-2.5), "-2.5");
        assert_eq!(format_num(0.1 + 0.2), "0.3");
        assert_eq!(format_num(0.0001), "0.0001");
        assert_eq!(format_num(123456.0), "123456");
        assert_eq!(format_num(1234567.0), "1.23457e+06");
        assert_eq!(format_num(1e-5), "1e-05");
        assert_eq!(format_num(1e9), "1e+09");
        assert_eq!(format_num(999999.7), "1e+06");
    }

    #[test]
    fn encode_moved_object() {
        let cmd = Command::MoveEntity {
            name: EntityName::intern("V1"),
            old: Point::new(0.0, 0.0),
            new: Point::new(100.0, 50.5),
        };
        assert_eq!(encode(&cmd), r#"MOVEDOBJECT "V1" 0 0 100 50.5"#);
    }

    #[test]
    fn encode_escapes_quotes_and_backslashes() {
        let cmd = Command::ChangedParameter {
            entity: EntityName::intern("Gain"),
            parameter: "k".into(),
            old: "1".into(),
            new: r#"a"b\c"#.into(),
        };
        assert_eq!(encode(&cmd), r#"PARAMETER "Gain" "k" "1" "a\"b\\c""#);
    }

    #[test]
    fn encode_keeps_line_breaks_on_one_line() {
        let cmd = Command::ChangedParameter {
            entity: EntityName::intern("Gain"),
            parameter: "k".into(),
            old: "1".into(),
            new: "p_sys\r\n+1".into(),
        };
        let line = encode(&cmd);
        assert_eq!(line, r#"PARAMETER "Gain" "k" "1" "p_sys\r\n+1""#);
        assert_eq!(encode_all([&cmd]).lines().count(), 1);
    }

    #[test]
    fn encode_connector_with_waypoints() {
        let mut spec = ConnectorSpec::new(PortRef::new("P1", "P2"), PortRef::new("V1", "PA"));
        spec.waypoints = vec![Point::new(10.0, 20.0)];
        assert_eq!(
            encode(&Command::AddConnector(spec)),
            r#"ADDEDCONNECTOR "P1" "P2" "V1" "PA" 10 20"#
        );
    }

    #[test]
    fn encode_all_terminates_lines() {
        let flip = Command::FlipVertical {
            name: EntityName::intern("T1"),
        };
        assert_eq!(encode_all([&flip, &flip]), "VERTICALFLIP \"T1\"\nVERTICALFLIP \"T1\"\n");
    }
}
