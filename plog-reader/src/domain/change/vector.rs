use plog_types::types::{ChangeHeader, ChangeVector, ColumnValue, Field, Table};

use crate::{errors::Result, format::tag::TagType};

use super::{apply_location, column_value, decode_image, image_column, is_location, Image};

pub(super) fn empty(header: ChangeHeader) -> ChangeVector {
    ChangeVector {
        header,
        ..Default::default()
    }
}

/// Vector view: images kept in separate lists, in encoded order.
pub(super) fn assemble(
    header: ChangeHeader,
    table: &Table,
    images: &[Image<'_>],
) -> Result<ChangeVector> {
    let mut vector = empty(header);
    for image in images {
        let Some((_, column)) = image_column(table, image) else {
            continue;
        };
        let tag_type = image.tag.tag_type;
        if is_location(tag_type) {
            if !vector.lob.iter().any(|value| value.id == column.id) {
                vector.lob.push(column_value(column, Field::Null));
            }
            if let Some(value) = lob_value(&mut vector.lob, column.id) {
                apply_location(value, image.tag)?;
            }
            continue;
        }

        let mut value = column_value(column, decode_image(column, image.tag)?);
        match tag_type {
            TagType::KeyImage => {
                value.is_supplemental_key = true;
                vector.key.push(value);
            }
            TagType::OldImage => vector.old.push(value),
            TagType::NewImage => vector.new.push(value),
            _ => match lob_value(&mut vector.lob, column.id) {
                // location tags came first
                Some(placeholder) if placeholder.value.is_null() => placeholder.value = value.value,
                _ => vector.lob.push(value),
            },
        }
    }
    Ok(vector)
}

fn lob_value(values: &mut [ColumnValue], id: u32) -> Option<&mut ColumnValue> {
    values.iter_mut().rev().find(|value| value.id == id)
}
