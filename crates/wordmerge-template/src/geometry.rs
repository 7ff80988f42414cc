/*
 * geometry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Sizing of rendered images inside their placeholder shape.
//!
//! The placeholder's declared extent is the box the image must fit. Sizing
//! directives are read from the picture's description (`pic:cNvPr/@descr`):
//!
//! - (none): scale the image to fit inside the box, keeping its aspect ratio
//! - `auto`: keep the box width, derive the height from the image
//! - `rect`: keep the box and crop the image to the box aspect; `left`,
//!   `right`, `top`, `bottom` choose which part stays visible (default center)

use wordmerge_xml::{NodeId, XmlDocument};

use crate::content::ImageSpec;

/// `a:srcRect` offsets are expressed in thousandths of a percent.
const FULL_RECT: f64 = 100_000.0;

/// A shape size in EMUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub cx: i64,
    pub cy: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    Start,
    #[default]
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sizing {
    #[default]
    Fit,
    Auto,
    Rect { horizontal: Align, vertical: Align },
}

/// Crop offsets for `a:srcRect` (left, top, right, bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SrcRect {
    pub l: i64,
    pub t: i64,
    pub r: i64,
    pub b: i64,
}

impl Sizing {
    /// Parse the directives of a picture description. Unknown words are
    /// ignored so ordinary alt text does not affect sizing.
    pub fn parse(descr: &str) -> Self {
        let words: Vec<String> = descr
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let has = |word: &str| words.iter().any(|w| w == word);

        if has("rect") {
            let horizontal = match (has("left"), has("right")) {
                (true, false) => Align::Start,
                (false, true) => Align::End,
                _ => Align::Center,
            };
            let vertical = match (has("top"), has("bottom")) {
                (true, false) => Align::Start,
                (false, true) => Align::End,
                _ => Align::Center,
            };
            Sizing::Rect {
                horizontal,
                vertical,
            }
        } else if has("auto") {
            Sizing::Auto
        } else {
            Sizing::Fit
        }
    }
}

/// The extent of an image of `width`×`height` pixels placed in `frame`.
pub fn fit_extent(frame: Extent, width: u32, height: u32, sizing: Sizing) -> Extent {
    if width == 0 || height == 0 {
        return frame;
    }
    let (w, h) = (f64::from(width), f64::from(height));

    match sizing {
        Sizing::Rect { .. } => frame,
        Sizing::Auto => Extent {
            cx: frame.cx,
            cy: (frame.cx as f64 * h / w).round() as i64,
        },
        Sizing::Fit => {
            let scale = (frame.cx as f64 / w).min(frame.cy as f64 / h);
            Extent {
                cx: (w * scale).round() as i64,
                cy: (h * scale).round() as i64,
            }
        }
    }
}

/// Crop offsets that make an image of `width`×`height` fill `frame` without
/// distortion.
pub fn crop_rect(
    frame: Extent,
    width: u32,
    height: u32,
    horizontal: Align,
    vertical: Align,
) -> SrcRect {
    if width == 0 || height == 0 || frame.cx <= 0 || frame.cy <= 0 {
        return SrcRect::default();
    }
    let image_aspect = f64::from(width) / f64::from(height);
    let frame_aspect = frame.cx as f64 / frame.cy as f64;

    let mut rect = SrcRect::default();
    if image_aspect > frame_aspect {
        let cropped = ((1.0 - frame_aspect / image_aspect) * FULL_RECT).round() as i64;
        (rect.l, rect.r) = split(cropped, horizontal);
    } else if image_aspect < frame_aspect {
        let cropped = ((1.0 - image_aspect / frame_aspect) * FULL_RECT).round() as i64;
        (rect.t, rect.b) = split(cropped, vertical);
    }
    rect
}

/// Distribute a crop between the leading and trailing edge.
fn split(cropped: i64, align: Align) -> (i64, i64) {
    match align {
        Align::Start => (0, cropped),
        Align::End => (cropped, 0),
        Align::Center => {
            let leading = cropped / 2;
            (leading, cropped - leading)
        }
    }
}

/// Resize (and for `rect`, crop) the picture in `drawing` for `image`.
///
/// Placeholders without a declared extent are left alone.
pub fn apply(doc: &mut XmlDocument, drawing: NodeId, image: &ImageSpec) {
    let Some(extent_node) = doc.find(drawing, "wp:extent") else {
        return;
    };
    let Some(frame) = read_extent(doc, extent_node) else {
        return;
    };

    let sizing = doc
        .find(drawing, "pic:cNvPr")
        .and_then(|node| doc.attribute(node, "descr"))
        .map(Sizing::parse)
        .unwrap_or_default();

    let extent = fit_extent(frame, image.width, image.height, sizing);
    write_extent(doc, extent_node, extent);
    if let Some(ext) = doc.find(drawing, "a:xfrm").and_then(|xfrm| doc.find(xfrm, "a:ext")) {
        write_extent(doc, ext, extent);
    }

    if let Sizing::Rect {
        horizontal,
        vertical,
    } = sizing
    {
        let rect = crop_rect(frame, image.width, image.height, horizontal, vertical);
        write_src_rect(doc, drawing, rect);
    }
}

fn read_extent(doc: &XmlDocument, node: NodeId) -> Option<Extent> {
    let cx: i64 = doc.attribute(node, "cx")?.parse().ok()?;
    let cy: i64 = doc.attribute(node, "cy")?.parse().ok()?;
    (cx > 0 && cy > 0).then_some(Extent { cx, cy })
}

fn write_extent(doc: &mut XmlDocument, node: NodeId, extent: Extent) {
    doc.set_attribute(node, "cx", extent.cx.to_string());
    doc.set_attribute(node, "cy", extent.cy.to_string());
}

fn write_src_rect(doc: &mut XmlDocument, drawing: NodeId, rect: SrcRect) {
    let Some(blip) = doc.find(drawing, "a:blip") else {
        return;
    };
    let src_rect = match doc.next_element(blip).filter(|&n| doc.is_element(n, "a:srcRect")) {
        Some(existing) => existing,
        None => {
            let created = doc.create_element("a:srcRect");
            doc.insert_after(blip, created);
            created
        }
    };

    for (name, value) in [("l", rect.l), ("t", rect.t), ("r", rect.r), ("b", rect.b)] {
        match value {
            0 => {
                if let Some(element) = doc.element_mut(src_rect) {
                    element.remove_attribute(name);
                }
            }
            value => doc.set_attribute(src_rect, name, value.to_string()),
        }
    }
}
