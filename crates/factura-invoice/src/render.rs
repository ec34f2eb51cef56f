//! # Invoice Renderer
//!
//! Draws an [`InvoiceLayout`] onto US Letter pages with printpdf.
//!
//! ## Coordinates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layout math is done in points (1/72 in), origin bottom-left, and      │
//! │  converted to Mm only when handed to printpdf.                         │
//! │                                                                         │
//! │   792 ┬───────────────────────────────┐                                │
//! │       │ 40pt margin                   │                                │
//! │   752 ┤ ← cursor starts here, moves ↓ │                                │
//! │       │                               │                                │
//! │    40 ┤ ← rows past this line go to a │                                │
//! │       │   new page (header repeated)  │                                │
//! │     0 ┴───────────────────────────────┘                                │
//! │       0                              612                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Right-aligned and centred text is positioned from Helvetica's glyph
//! widths, since built-in fonts carry no metrics printpdf can query. The
//! same widths cut table cells that would spill into the next column.
//!
//! The header logo is `assets/logo.png`, compiled in, unless a file is
//! configured or the logo is turned off.

use chrono::{FixedOffset, Offset, Utc};
use image::codecs::png::PngDecoder;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rect, Rgb,
};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::InvoiceError;
use crate::layout::{InvoiceLayout, IssuerProfile, TABLE_HEADER, TITLE};
use factura_core::{InvoiceData, TaxRate};

/// Header emblem used when no logo file is configured.
const BUNDLED_LOGO: &[u8] = include_bytes!("../assets/logo.png");

// =============================================================================
// Page Geometry (points)
// =============================================================================

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 40.0;
const FRAME_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const HEADER_COLUMNS: [f32; 3] = [86.4, 201.6, 180.0];
const TABLE_COLUMNS: [f32; 4] = [180.0, 72.0, 90.0, 90.0];
const SUMMARY_COLUMNS: [f32; 2] = [324.0, 108.0];

const HEADER_ROW_HEIGHT: f32 = 20.0;
const ROW_HEIGHT: f32 = 18.0;
const TOTAL_ROW_HEIGHT: f32 = 24.0;
const CELL_PADDING: f32 = 6.0;
const LEADING: f32 = 12.0;

const LOGO_WIDTH: f32 = 100.0;
const LOGO_HEIGHT: f32 = 50.0;

const ELLIPSIS: &str = "...";

const TITLE_SIZE: f32 = 26.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_HEADER_SIZE: f32 = 11.0;
const TOTAL_SIZE: f32 = 14.0;

// =============================================================================
// Rendered Output
// =============================================================================

/// A finished invoice document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedInvoice {
    /// `factura-{sale_id}.pdf`
    pub filename: String,
    pub bytes: Vec<u8>,
    pub pages: usize,
}

impl RenderedInvoice {
    pub fn filename_for(sale_id: i64) -> String {
        format!("factura-{}.pdf", sale_id)
    }
}

// =============================================================================
// Renderer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Logo {
    Bundled,
    File(PathBuf),
    Hidden,
}

/// Renders invoices with a fixed issuer, tax rate and logo.
///
/// ## Usage
/// ```rust,ignore
/// let renderer = InvoiceRenderer::new(IssuerProfile::default(), TaxRate::default(), None);
/// let pdf = renderer.render(&db.sales().get_invoice_data(sale_id).await?)?;
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceRenderer {
    issuer: IssuerProfile,
    tax_rate: TaxRate,
    logo: Logo,
    offset: FixedOffset,
}

impl InvoiceRenderer {
    /// `logo_path` replaces the bundled logo. `None` keeps the bundled one.
    pub fn new(issuer: IssuerProfile, tax_rate: TaxRate, logo_path: Option<PathBuf>) -> Self {
        InvoiceRenderer {
            issuer,
            tax_rate,
            logo: logo_path.map_or(Logo::Bundled, Logo::File),
            offset: Utc.fix(),
        }
    }

    /// Leaves the logo cell of the header empty.
    pub fn without_logo(mut self) -> Self {
        self.logo = Logo::Hidden;
        self
    }

    /// Timezone the invoice date is printed in. Defaults to UTC.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn layout(&self, data: &InvoiceData) -> Result<InvoiceLayout, InvoiceError> {
        Ok(InvoiceLayout::build(data, &self.issuer, self.tax_rate, self.offset)?)
    }

    /// Produces the PDF for one sale.
    ///
    /// ## Errors
    /// * `InvoiceError::Asset` - the configured logo cannot be read or decoded
    /// * `InvoiceError::Totals` - a line or total does not fit in i64 cents
    /// * `InvoiceError::Pdf` - printpdf failed to build the document
    pub fn render(&self, data: &InvoiceData) -> Result<RenderedInvoice, InvoiceError> {
        let layout = self.layout(data)?;
        let logo = match &self.logo {
            Logo::Bundled => Some(bundled_logo()?),
            Logo::File(path) => Some(load_logo(path)?),
            Logo::Hidden => None,
        };

        let (doc, page, layer) = PdfDocument::new(
            format!("Factura {}", layout.number),
            mm(PAGE_WIDTH),
            mm(PAGE_HEIGHT),
            "Layer 1",
        );
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

        let mut canvas = Canvas {
            layer: doc.get_page(page).get_layer(layer),
            doc: &doc,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        };

        canvas.title();
        canvas.header(&layout, logo);
        canvas.table(&layout);
        canvas.summary(&layout);
        canvas.footer(&layout.footer);

        let pages = canvas.pages;
        drop(canvas);
        let bytes = doc.save_to_bytes().map_err(pdf_error)?;

        debug!(
            sale_id = layout.number,
            rows = layout.rows.len(),
            pages,
            size = bytes.len(),
            "Invoice rendered"
        );

        Ok(RenderedInvoice {
            filename: RenderedInvoice::filename_for(layout.number),
            bytes,
            pages,
        })
    }
}

fn pdf_error(e: impl std::fmt::Debug) -> InvoiceError {
    InvoiceError::Pdf(format!("{:?}", e))
}

fn load_logo(path: &Path) -> Result<Image, InvoiceError> {
    let asset_error = |reason: String| InvoiceError::Asset {
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path).map_err(|e| asset_error(e.to_string()))?;
    let decoder = PngDecoder::new(BufReader::new(file)).map_err(|e| asset_error(e.to_string()))?;

    Image::try_from(decoder).map_err(|e| asset_error(e.to_string()))
}

fn bundled_logo() -> Result<Image, InvoiceError> {
    fn asset_error(e: impl std::fmt::Display) -> InvoiceError {
        InvoiceError::Asset {
            path: "assets/logo.png".to_string(),
            reason: e.to_string(),
        }
    }

    let decoder = PngDecoder::new(Cursor::new(BUNDLED_LOGO)).map_err(asset_error)?;
    Image::try_from(decoder).map_err(asset_error)
}

// =============================================================================
// Canvas
// =============================================================================

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

struct Canvas<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Top of the free area, in points.
    y: f32,
    pages: usize,
}

impl Canvas<'_> {
    fn title(&mut self) {
        self.y -= TITLE_SIZE;
        self.text(TITLE, MARGIN, FRAME_WIDTH, self.y, TITLE_SIZE, true, accent(), Align::Center);
        self.y -= 20.0;
    }

    fn header(&mut self, layout: &InvoiceLayout, logo: Option<Image>) {
        let x0 = MARGIN + (FRAME_WIDTH - HEADER_COLUMNS.iter().sum::<f32>()) / 2.0;
        let issuer_x = x0 + HEADER_COLUMNS[0];
        let customer_x = issuer_x + HEADER_COLUMNS[1];

        let text_lines = layout.issuer_lines.len().max(layout.customer_lines.len());
        let height = (text_lines as f32 * LEADING).max(LOGO_HEIGHT) + 12.0;
        let top = self.y;

        if let Some(logo) = logo {
            let width_px = logo.image.width.0.max(1) as f32;
            let height_px = logo.image.height.0.max(1) as f32;
            let left = x0 + (HEADER_COLUMNS[0] - LOGO_WIDTH) / 2.0;
            let bottom = top - (height - 12.0 + LOGO_HEIGHT) / 2.0;

            logo.add_to_layer(
                self.layer.clone(),
                ImageTransform {
                    translate_x: Some(mm(left)),
                    translate_y: Some(mm(bottom)),
                    scale_x: Some(LOGO_WIDTH / width_px),
                    scale_y: Some(LOGO_HEIGHT / height_px),
                    dpi: Some(72.0),
                    ..Default::default()
                },
            );
        }

        for (i, line) in layout.issuer_lines.iter().enumerate() {
            let baseline = top - BODY_SIZE - i as f32 * LEADING;
            self.text(
                line,
                issuer_x + CELL_PADDING,
                HEADER_COLUMNS[1],
                baseline,
                BODY_SIZE,
                i == 0,
                gray(),
                Align::Left,
            );
        }

        for (i, line) in layout.customer_lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let baseline = top - BODY_SIZE - i as f32 * LEADING;
            let bold = line.ends_with(':');
            self.text(
                line,
                customer_x,
                HEADER_COLUMNS[2] - CELL_PADDING,
                baseline,
                BODY_SIZE,
                bold,
                gray(),
                Align::Right,
            );
        }

        self.y = top - height - 15.0;
    }

    fn table(&mut self, layout: &InvoiceLayout) {
        self.table_header_row();

        for (i, row) in layout.rows.iter().enumerate() {
            if self.y - ROW_HEIGHT < MARGIN {
                self.new_page();
                self.table_header_row();
            }

            let shade = if i % 2 == 0 { 0.96 } else { 0.83 };
            let fill = Color::Rgb(Rgb::new(shade, shade, shade, None));
            let aligns = [Align::Left, Align::Center, Align::Right, Align::Right];
            self.row(row, ROW_HEIGHT, Some(fill), |canvas, cell, x, w, baseline, col| {
                let cell = fit_text(cell, w, BODY_SIZE, false);
                canvas.text(&cell, x, w, baseline, BODY_SIZE, false, black(), aligns[col]);
            });
        }

        self.y -= 20.0;
    }

    fn table_header_row(&mut self) {
        let cells = TABLE_HEADER.map(str::to_string);
        self.row(&cells, HEADER_ROW_HEIGHT, Some(accent()), |canvas, cell, x, w, baseline, _| {
            canvas.text(cell, x, w, baseline, TABLE_HEADER_SIZE, true, white(), Align::Center);
        });
    }

    /// Draws one grid row at the cursor and moves below it.
    fn row<F>(&mut self, cells: &[String; 4], height: f32, fill: Option<Color>, mut draw: F)
    where
        F: FnMut(&mut Self, &str, f32, f32, f32, usize),
    {
        let x0 = table_left(&TABLE_COLUMNS);
        let width: f32 = TABLE_COLUMNS.iter().sum();
        let bottom = self.y - height;

        if let Some(fill) = fill {
            self.fill_rect(x0, bottom, width, height, fill);
        }

        let baseline = bottom + (height - BODY_SIZE) / 2.0 + 2.0;
        let mut x = x0;
        for (col, (cell, w)) in cells.iter().zip(TABLE_COLUMNS).enumerate() {
            draw(self, cell, x + CELL_PADDING, w - 2.0 * CELL_PADDING, baseline, col);
            self.stroke_rect(x, bottom, w, height, gray(), 0.5);
            x += w;
        }

        self.y = bottom;
    }

    fn summary(&mut self, layout: &InvoiceLayout) {
        let needed = ROW_HEIGHT * 2.0 + TOTAL_ROW_HEIGHT + 25.0 + LEADING;
        if self.y - needed < MARGIN {
            self.new_page();
        }

        let x0 = table_left(&SUMMARY_COLUMNS);
        let width: f32 = SUMMARY_COLUMNS.iter().sum();
        let last = layout.summary.len().saturating_sub(1);

        for (i, row) in layout.summary.iter().enumerate() {
            let emphasized = i == last;
            let (height, size, color) = if emphasized {
                (TOTAL_ROW_HEIGHT, TOTAL_SIZE, accent())
            } else {
                (ROW_HEIGHT, BODY_SIZE, black())
            };
            let bottom = self.y - height;

            if emphasized {
                self.fill_rect(x0, bottom, width, height, rgb(0xFF, 0xEB, 0xEE));
                self.stroke_rect(x0, bottom, width, height, accent(), 1.0);
            }

            let baseline = bottom + (height - size) / 2.0 + 2.0;
            self.text(
                &row.label,
                x0 + CELL_PADDING,
                SUMMARY_COLUMNS[0] - 2.0 * CELL_PADDING,
                baseline,
                size,
                emphasized,
                color.clone(),
                Align::Right,
            );
            self.text(
                &row.value,
                x0 + SUMMARY_COLUMNS[0] + CELL_PADDING,
                SUMMARY_COLUMNS[1] - 2.0 * CELL_PADDING,
                baseline,
                size,
                emphasized,
                color,
                Align::Right,
            );

            self.y = bottom;
        }

        self.y -= 25.0;
    }

    fn footer(&mut self, footer: &str) {
        if footer.is_empty() {
            return;
        }
        self.y -= BODY_SIZE;
        self.text(footer, MARGIN, FRAME_WIDTH, self.y, BODY_SIZE, false, gray(), Align::Left);
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    // -------------------------------------------------------------------------
    // Primitives
    // -------------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn text(
        &self,
        text: &str,
        x: f32,
        width: f32,
        baseline: f32,
        size: f32,
        bold: bool,
        color: Color,
        align: Align,
    ) {
        let text_width = text_width(text, size, bold);
        let left = match align {
            Align::Left => x,
            Align::Center => x + (width - text_width) / 2.0,
            Align::Right => x + width - text_width,
        };

        let font = if bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(color);
        self.layer.use_text(text, size, mm(left), mm(baseline), font);
    }

    fn fill_rect(&self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.layer.set_fill_color(color);
        self.layer.add_rect(
            Rect::new(mm(x), mm(y), mm(x + width), mm(y + height)).with_mode(PaintMode::Fill),
        );
    }

    fn stroke_rect(&self, x: f32, y: f32, width: f32, height: f32, color: Color, thickness: f32) {
        self.layer.set_outline_color(color);
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(mm(x), mm(y)), false),
                (Point::new(mm(x + width), mm(y)), false),
                (Point::new(mm(x + width), mm(y + height)), false),
                (Point::new(mm(x), mm(y + height)), false),
            ],
            is_closed: true,
        });
    }
}

fn table_left(columns: &[f32]) -> f32 {
    MARGIN + (FRAME_WIDTH - columns.iter().sum::<f32>()) / 2.0
}

fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

fn accent() -> Color {
    rgb(0xD3, 0x2F, 0x2F)
}

fn gray() -> Color {
    Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn white() -> Color {
    Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None))
}

// =============================================================================
// Helvetica Metrics
// =============================================================================

/// Approximate advance width of `text` in points.
///
/// Digits and currency punctuation are exact (they are what gets
/// right-aligned); letters use per-class averages.
fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| glyph_units(c, bold)).sum();
    units as f32 * size / 1000.0
}

/// `text` cut to fit `width`, ending in "..." when anything was dropped.
fn fit_text(text: &str, width: f32, size: f32, bold: bool) -> String {
    if text_width(text, size, bold) <= width {
        return text.to_string();
    }

    let budget = width - text_width(ELLIPSIS, size, bold);
    let mut used = 0.0;
    let mut kept = String::new();
    for c in text.chars() {
        used += glyph_units(c, bold) as f32 * size / 1000.0;
        if used > budget {
            break;
        }
        kept.push(c);
    }
    format!("{}{}", kept.trim_end(), ELLIPSIS)
}

fn glyph_units(c: char, bold: bool) -> u32 {
    match c {
        '0'..='9' | '$' => 556,
        '.' | ',' | ' ' | '/' => 278,
        ':' | ';' => {
            if bold {
                333
            } else {
                278
            }
        }
        '-' | '(' | ')' => 333,
        '%' => 889,
        '@' => {
            if bold {
                975
            } else {
                1015
            }
        }
        '°' => 400,
        'i' | 'j' | 'l' => {
            if bold {
                278
            } else {
                222
            }
        }
        'f' | 't' | 'r' | 'I' => {
            if bold {
                333
            } else {
                300
            }
        }
        'm' | 'w' => {
            if bold {
                889
            } else {
                833
            }
        }
        'M' | 'W' => 889,
        c if c.is_uppercase() => {
            if bold {
                722
            } else {
                667
            }
        }
        _ => {
            if bold {
                611
            } else {
                556
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
