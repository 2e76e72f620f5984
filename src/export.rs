//! IDF export — write a user view factors record as EnergyPlus input.
//!
//! ```text
//! ZoneProperty:UserViewFactors:BySurfaceName,
//!   Zone 1,                                 !- Zone or ZoneList Name
//!   Wall 1,                                 !- From Surface 1
//!   Window 1,                               !- To Surface 1
//!   0.5;                                    !- View Factor 1
//! ```

use std::io::Write;

use crate::relation::{ViewFactorRelation, IDD_OBJECT_NAME};
use crate::storage::EntityStore;
use crate::{Error, Result};

/// Column at which `!-` field comments start.
const COMMENT_COLUMN: usize = 42;

/// Characters that end a field, end the object or start a comment in IDF.
const IDF_DELIMITERS: [char; 3] = [',', ';', '!'];

/// Export one relation as an IDF object.
///
/// Reads every view factor and checks every name first, so a stale
/// reference or a name containing an IDF delimiter fails the export before
/// anything is written.
pub fn export_idf<S: EntityStore>(
    relation: &ViewFactorRelation<S>,
    writer: &mut dyn Write,
) -> Result<()> {
    let zone = relation.thermal_zone();
    let zone_name = relation
        .store()
        .entity(zone)
        .map(|e| e.name)
        .ok_or_else(|| Error::NotFound(format!("Zone {zone}")))?;
    let view_factors = relation.try_view_factors()?;

    check_field(&zone_name, "Zone or ZoneList Name")?;
    for (i, vf) in view_factors.iter().enumerate() {
        let n = i + 1;
        check_field(&vf.from_surface().name, &format!("From Surface {n}"))?;
        check_field(&vf.to_surface().name, &format!("To Surface {n}"))?;
    }

    writeln!(writer, "{IDD_OBJECT_NAME},")?;
    let last = view_factors.len();
    write_field(writer, &zone_name, "Zone or ZoneList Name", last == 0)?;

    for (i, vf) in view_factors.iter().enumerate() {
        let n = i + 1;
        write_field(writer, &vf.from_surface().name, &format!("From Surface {n}"), false)?;
        write_field(writer, &vf.to_surface().name, &format!("To Surface {n}"), false)?;
        write_field(writer, &vf.view_factor().to_string(), &format!("View Factor {n}"), n == last)?;
    }

    tracing::debug!(%zone, view_factors = last, "exported {IDD_OBJECT_NAME}");
    Ok(())
}

/// Export to a `String`.
pub fn export_idf_string<S: EntityStore>(relation: &ViewFactorRelation<S>) -> Result<String> {
    let mut buf = Vec::new();
    export_idf(relation, &mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::InvariantViolation(format!("IDF export is not UTF-8: {e}")))
}

fn check_field(value: &str, field: &str) -> Result<()> {
    if value.contains(IDF_DELIMITERS) {
        tracing::error!(value, field, "name cannot be written as an IDF field");
        return Err(Error::InvalidIdfField { field: field.to_string(), value: value.to_string() });
    }
    Ok(())
}

fn write_field(writer: &mut dyn Write, value: &str, comment: &str, terminal: bool) -> Result<()> {
    let field = format!("  {value}{}", if terminal { ';' } else { ',' });
    writeln!(writer, "{field:<width$}!- {comment}", width = COMMENT_COLUMN)?;
    Ok(())
}
