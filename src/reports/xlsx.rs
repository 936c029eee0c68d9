use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};

use super::{Cell, Report};

const CURRENCY_FORMAT: &str = "#,##0.00 \"€\"";

/// Serialize a report into an `.xlsx` workbook, one worksheet per sheet.
pub fn to_xlsx(report: &Report) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xDCE6F1));
    let currency = Format::new().set_num_format(CURRENCY_FORMAT);

    for sheet in &report.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;

        for (col, title) in sheet.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *title, &header)?;
        }

        for (i, row) in sheet.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                match cell {
                    Cell::Text(value) => {
                        worksheet.write_string(r, c, value)?;
                    }
                    Cell::Integer(value) => {
                        worksheet.write_number(r, c, *value as f64)?;
                    }
                    Cell::Currency(value) => {
                        worksheet.write_number_with_format(r, c, *value, &currency)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofit();
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::build_report;

    #[test]
    fn test_workbook_is_a_zip_container() {
        let report = build_report(&[], &[], &[]);
        let bytes = to_xlsx(&report).unwrap();

        assert!(bytes.starts_with(b"PK"));
    }
}
