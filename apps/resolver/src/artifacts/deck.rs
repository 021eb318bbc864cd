//! Presentation deck writer.
//!
//! Emits a minimal Office Open XML package (one master, one blank layout,
//! one theme, one slide per applicant) straight through `zip`. Slides are
//! 13.33 × 7.5 in. Every slide has a header band and three panels:
//! SOLICITA, ANTECEDENTES and RESOLUCIÓN.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::artifacts::assemble::{ArtifactError, FinalRow};
use crate::artifacts::format::{currency, fuas_application, or_fallback, ratio};

pub const DECK_FILE: &str = "propuestas_resolucion.pptx";

const EMU_PER_INCH: f64 = 914_400.0;
const SLIDE_WIDTH_IN: f64 = 13.33;
const SLIDE_HEIGHT_IN: f64 = 7.5;

const HEADER_FILL: &str = "FFC000";
const HEADER_LINE: &str = "8EB4E3";
const CARD_FILL: &str = "FFFFFF";
const CARD_LINE: &str = "C8C8C8";
const BUTTON_FILL: &str = "0D223C";
const BLACK: &str = "000000";
const WHITE: &str = "FFFFFF";

const NO_INFORMATION: &str = "No hay información disponible";

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Writes one slide per row to `path`.
pub fn write_deck(path: &Path, rows: &[FinalRow]) -> Result<(), ArtifactError> {
    let file = File::create(path)?;
    write_package(file, rows)?;
    info!("Wrote deck with {} slides to {}", rows.len(), path.display());
    Ok(())
}

fn write_package<W: Write + Seek>(sink: W, rows: &[FinalRow]) -> Result<(), ArtifactError> {
    let mut zip = ZipWriter::new(sink);

    part(&mut zip, "[Content_Types].xml", &content_types(rows.len()))?;
    part(&mut zip, "_rels/.rels", &root_rels())?;
    part(&mut zip, "ppt/presentation.xml", &presentation(rows.len()))?;
    part(&mut zip, "ppt/_rels/presentation.xml.rels", &presentation_rels(rows.len()))?;
    part(&mut zip, "ppt/slideMasters/slideMaster1.xml", &slide_master())?;
    part(
        &mut zip,
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &rels(&[
            ("slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("theme", "../theme/theme1.xml"),
        ]),
    )?;
    part(&mut zip, "ppt/slideLayouts/slideLayout1.xml", &slide_layout())?;
    part(
        &mut zip,
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        &rels(&[("slideMaster", "../slideMasters/slideMaster1.xml")]),
    )?;
    part(&mut zip, "ppt/theme/theme1.xml", THEME)?;

    let slide_rels = rels(&[("slideLayout", "../slideLayouts/slideLayout1.xml")]);
    for (i, row) in rows.iter().enumerate() {
        let n = i + 1;
        part(&mut zip, &format!("ppt/slides/slide{n}.xml"), &slide_xml(row))?;
        part(&mut zip, &format!("ppt/slides/_rels/slide{n}.xml.rels"), &slide_rels)?;
    }

    zip.finish()?;
    Ok(())
}

fn part<W: Write + Seek>(zip: &mut ZipWriter<W>, name: &str, body: &str) -> Result<(), ArtifactError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(name, options)?;
    zip.write_all(body.as_bytes())?;
    Ok(())
}

// ──────────────────────────────────────────────────────────────────────────
// Slide content
// ──────────────────────────────────────────────────────────────────────────

struct Panel<'a> {
    title: &'a str,
    sections: [(&'a str, String); 2],
    button: &'a str,
}

/// Renders the slide for one applicant.
pub fn slide_xml(row: &FinalRow) -> String {
    let applicant = row.enriched.applicant();
    let decision = &row.decision;
    let evidence = row.enriched.evidence.as_str();
    let mut slide = SlideBuilder::default();

    slide.shape(Rect::inches(0.25, 0.2, 12.9, 1.6), HEADER_FILL, HEADER_LINE);
    let header = TextStyle { size: 14, bold: true, color: BLACK, align: Align::Left };
    let band = TextStyle { size: 10, bold: false, color: WHITE, align: Align::Left };
    slide.text(
        Rect::inches(0.5, 0.2, 4.0, 0.5),
        &format!("{}\n{}", applicant.name, applicant.key),
        header,
    );
    slide.text(
        Rect::inches(5.0, 0.2, 4.0, 0.5),
        &format!("{}\n{}", applicant.program, applicant.campus),
        header,
    );
    slide.text(
        Rect::inches(9.5, 0.2, 3.5, 0.5),
        &format!("MATRÍCULA\nCON CURSOS: {}", applicant.enrolled_with_courses),
        TextStyle { align: Align::Right, ..header },
    );
    slide.text(
        Rect::inches(0.7, 1.0, 2.0, 0.3),
        &format!("Ingresa: {}", applicant.entry_term),
        band,
    );
    slide.text(
        Rect::inches(5.0, 1.0, 4.0, 0.3),
        &format!("MOTIVO DEL CASO:\n{}", decision.case_reason),
        TextStyle { size: 12, ..band },
    );
    slide.text(
        Rect::inches(10.5, 1.0, 2.5, 0.3),
        &format!("Envía Solicitud: {}", applicant.submitted_at),
        TextStyle { align: Align::Right, ..band },
    );

    let panels = [
        Panel {
            title: "SOLICITA",
            sections: [
                ("MOTIVO", applicant.request_motive.clone()),
                ("DOCUMENTOS", or_fallback(evidence, NO_INFORMATION).to_string()),
            ],
            button: "Solicitud",
        },
        Panel {
            title: "ANTECEDENTES",
            sections: [
                (
                    "ANTECEDENTES ECONÓMICOS",
                    format!(
                        "Beneficio: {}\nDeuda: {}\nPostulación a FUAS: {}\nArancel: {}\nMatrícula: {}",
                        applicant.prior_benefit,
                        currency(applicant.overdue_debt),
                        fuas_application(evidence),
                        currency(applicant.tuition_installment),
                        currency(applicant.enrollment_fee),
                    ),
                ),
                (
                    "ANTECEDENTES ACADÉMICOS",
                    format!(
                        "Avance Curricular: {}\nPPS: {}\nRSH: {}\nPromedio Ponderado Evaluación: {}",
                        applicant.curricular_progress,
                        applicant.pps,
                        applicant.socioeconomic_level,
                        ratio(applicant.score),
                    ),
                ),
            ],
            button: "Revisión",
        },
        Panel {
            title: "RESOLUCIÓN",
            sections: [
                ("RESOLUCIÓN", or_fallback(&decision.resolution, NO_INFORMATION).to_string()),
                ("MONTO DE LA BECA", currency(applicant.retention_plan)),
            ],
            button: "Resolución",
        },
    ];

    for (i, panel) in panels.iter().enumerate() {
        slide.panel(0.1 + i as f64 * 4.5, 2.0, panel);
    }

    slide.finish()
}

#[derive(Clone, Copy)]
struct Rect {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

impl Rect {
    fn inches(x: f64, y: f64, cx: f64, cy: f64) -> Self {
        Self {
            x: emu(x),
            y: emu(y),
            cx: emu(cx),
            cy: emu(cy),
        }
    }
}

fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn attr(self) -> &'static str {
        match self {
            Align::Left => "l",
            Align::Center => "ctr",
            Align::Right => "r",
        }
    }
}

#[derive(Clone, Copy)]
struct TextStyle {
    /// Points.
    size: u32,
    bold: bool,
    color: &'static str,
    align: Align,
}

#[derive(Default)]
struct SlideBuilder {
    shapes: String,
    next_id: u32,
}

impl SlideBuilder {
    fn id(&mut self) -> u32 {
        // id 1 is the shape tree itself
        self.next_id += 1;
        self.next_id + 1
    }

    fn shape(&mut self, rect: Rect, fill: &str, line: &str) {
        let id = self.id();
        self.shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Shape {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="roundRect"><a:avLst/></a:prstGeom><a:solidFill><a:srgbClr val="{fill}"/></a:solidFill><a:ln><a:solidFill><a:srgbClr val="{line}"/></a:solidFill></a:ln></p:spPr></p:sp>"#,
            xfrm(rect)
        ));
    }

    fn text(&mut self, rect: Rect, text: &str, style: TextStyle) {
        let id = self.id();
        self.shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>{}</p:sp>"#,
            xfrm(rect),
            text_body(text, style)
        ));
    }

    fn button(&mut self, rect: Rect, label: &str) {
        let id = self.id();
        let style = TextStyle { size: 14, bold: true, color: WHITE, align: Align::Center };
        self.shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Button {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="roundRect"><a:avLst/></a:prstGeom><a:solidFill><a:srgbClr val="{BUTTON_FILL}"/></a:solidFill><a:ln><a:noFill/></a:ln></p:spPr>{}</p:sp>"#,
            xfrm(rect),
            text_body(label, style)
        ));
    }

    fn panel(&mut self, left: f64, top: f64, panel: &Panel<'_>) {
        const WIDTH: f64 = 4.0;
        const HEIGHT: f64 = 5.3;
        let inner = WIDTH - 0.5;

        self.shape(Rect::inches(left, top, WIDTH, HEIGHT), CARD_FILL, CARD_LINE);
        self.text(
            Rect::inches(left + 0.25, top + 0.25, inner, 0.5),
            panel.title,
            TextStyle { size: 18, bold: true, color: BLACK, align: Align::Left },
        );

        let mut y = top + 0.75;
        for (subtitle, content) in &panel.sections {
            self.text(
                Rect::inches(left + 0.25, y, inner, 0.3),
                subtitle,
                TextStyle { size: 14, bold: true, color: BLACK, align: Align::Left },
            );
            y += 0.3;
            self.text(
                Rect::inches(left + 0.25, y, inner, 1.6),
                content,
                TextStyle { size: 12, bold: false, color: BLACK, align: Align::Left },
            );
            y += 1.7;
        }

        self.button(
            Rect::inches(left + 0.25, top + HEIGHT - 0.7, inner, 0.5),
            panel.button,
        );
    }

    fn finish(self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {NS}><p:cSld>{}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
            shape_tree(&self.shapes)
        )
    }
}

fn xfrm(rect: Rect) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        rect.x, rect.y, rect.cx, rect.cy
    )
}

fn text_body(text: &str, style: TextStyle) -> String {
    let bold = if style.bold { r#" b="1""# } else { "" };
    let paragraphs: String = text
        .lines()
        .map(|line| {
            format!(
                r#"<a:p><a:pPr algn="{}"/><a:r><a:rPr lang="es-CL" sz="{}"{bold} dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r></a:p>"#,
                style.align.attr(),
                style.size * 100,
                style.color,
                escape(line)
            )
        })
        .collect();
    let paragraphs = if paragraphs.is_empty() { "<a:p/>".to_string() } else { paragraphs };
    format!(r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody>"#)
}

fn shape_tree(shapes: &str) -> String {
    format!(
        r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree>"#
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}

// ──────────────────────────────────────────────────────────────────────────
// Package parts
// ──────────────────────────────────────────────────────────────────────────

fn content_types(slides: usize) -> String {
    let slide_overrides: String = (1..=slides)
        .map(|n| {
            format!(
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>{slide_overrides}</Types>"#
    )
}

fn root_rels() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{REL_TYPE}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
    )
}

/// Relationship part; ids are `rId1..` in slice order.
fn rels(targets: &[(&str, &str)]) -> String {
    let body: String = targets
        .iter()
        .enumerate()
        .map(|(i, (kind, target))| {
            format!(
                r#"<Relationship Id="rId{}" Type="{REL_TYPE}/{kind}" Target="{target}"/>"#,
                i + 1
            )
        })
        .collect();
    format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{REL_NS}">{body}</Relationships>"#)
}

// rId1 = master, rId2 = theme, rId3.. = slides.
fn presentation_rels(slides: usize) -> String {
    let slide_targets: Vec<String> = (1..=slides).map(|n| format!("slides/slide{n}.xml")).collect();
    let mut targets = vec![
        ("slideMaster", "slideMasters/slideMaster1.xml"),
        ("theme", "theme/theme1.xml"),
    ];
    targets.extend(slide_targets.iter().map(|t| ("slide", t.as_str())));
    rels(&targets)
}

fn presentation(slides: usize) -> String {
    let slide_ids: String = (0..slides)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, 3 + i))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
        emu(SLIDE_WIDTH_IN),
        emu(SLIDE_HEIGHT_IN)
    )
}

fn slide_master() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldMaster {NS}><p:cSld>{}</p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#,
        shape_tree("")
    )
}

fn slide_layout() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldLayout {NS} type="blank" preserve="1"><p:cSld name="Blank">{}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        shape_tree("")
    )
}

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Resolver"><a:themeElements><a:clrScheme name="Resolver"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="0D223C"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2><a:accent1><a:srgbClr val="FFC000"/></a:accent1><a:accent2><a:srgbClr val="8EB4E3"/></a:accent2><a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4><a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6><a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="Resolver"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Resolver"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;
