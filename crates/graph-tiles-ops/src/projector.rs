//! Projection of a converged layout onto a zoom level's canvas, and the
//! rasterizer that turns the resulting scene into pixels.

use graph_tiles_core::{Graph, Position};
use tiny_skia::{
    BlendMode, Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

use crate::error::RenderError;
use crate::pyramid::TileRect;
use crate::style::{color, with_opacity, GroupPalette, LineCap, Style};

/// Maps layout coordinates to canvas pixels: `pixel = layout * k + (tx, ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub tx: f64,
    pub ty: f64,
    pub k: f64,
}

impl ViewTransform {
    pub fn apply(&self, p: Position) -> Position {
        Position::new(p.x * self.k + self.tx, p.y * self.k + self.ty)
    }

    fn to_skia(self) -> Transform {
        Transform::from_row(
            self.k as f32,
            0.0,
            0.0,
            self.k as f32,
            self.tx as f32,
            self.ty as f32,
        )
    }
}

/// A styled circle, in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeDraw {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f64,
}

/// A styled line segment, in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkDraw {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub stroke: Color,
    pub width: f64,
    pub line_cap: LineCap,
}

/// Everything needed to rasterize one zoom level.
///
/// Geometry stays in layout space; `transform` places it on the canvas and
/// scales radii and stroke widths along with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub transform: ViewTransform,
    pub background: Option<Color>,
    /// Drawn first, underneath the nodes.
    pub links: Vec<LinkDraw>,
    pub nodes: Vec<NodeDraw>,
}

impl Scene {
    /// Build the scene for a square canvas of `size` pixels, centred on the
    /// layout origin and scaled by `scale`.
    pub fn new(
        graph: &Graph,
        positions: &[Position],
        style: &Style,
        size: u32,
        scale: f64,
    ) -> Result<Self, RenderError> {
        if positions.len() != graph.node_count() {
            return Err(RenderError::PositionCount {
                expected: graph.node_count(),
                actual: positions.len(),
            });
        }
        let palette = GroupPalette::new(graph.groups(), &style.colors)?;
        let fixed_fill = style.node_fill.as_deref().map(color).transpose()?;
        let node_stroke = with_opacity(color(&style.node_stroke)?, style.node_stroke_opacity);
        let link_stroke = with_opacity(color(&style.link_stroke)?, style.link_stroke_opacity);
        let background = style.background.as_deref().map(color).transpose()?;

        let links = graph
            .links()
            .iter()
            .map(|link| {
                let (s, t) = (positions[link.source], positions[link.target]);
                LinkDraw {
                    x1: s.x,
                    y1: s.y,
                    x2: t.x,
                    y2: t.y,
                    stroke: link_stroke,
                    width: style.link_stroke_width,
                    line_cap: style.link_stroke_linecap,
                }
            })
            .collect();

        let nodes = graph
            .nodes()
            .iter()
            .zip(positions)
            .map(|(node, p)| NodeDraw {
                x: p.x,
                y: p.y,
                radius: style.node_radius,
                fill: fixed_fill.unwrap_or_else(|| palette.color_of(node.group)),
                stroke: node_stroke,
                stroke_width: style.node_stroke_width,
            })
            .collect();

        let half = f64::from(size) / 2.0;
        Ok(Self {
            width: size,
            height: size,
            transform: ViewTransform {
                tx: half,
                ty: half,
                k: scale,
            },
            background,
            links,
            nodes,
        })
    }
}

/// An owned image that can be cut into tiles.
pub trait Raster: Clone + Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Copy `rect` into a new raster of exactly `rect.width x rect.height`.
    /// Pixels outside this raster come out transparent.
    fn extract(&self, rect: TileRect) -> Result<Self, RenderError>;

    /// Encode as PNG.
    fn encode(&self) -> Result<Vec<u8>, RenderError>;
}

/// Turns scenes into rasters.
pub trait Renderer: Send + Sync {
    type Raster: Raster;

    fn render(&self, scene: &Scene) -> Result<Self::Raster, RenderError>;
}

/// CPU rasterizer backed by tiny-skia.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkiaRenderer;

/// A tiny-skia pixmap.
#[derive(Debug, Clone)]
pub struct SkiaRaster {
    pixmap: Pixmap,
}

impl SkiaRaster {
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Premultiplied RGBA bytes.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }
}

fn alloc(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    Pixmap::new(width, height).ok_or(RenderError::PixmapAlloc { width, height })
}

impl Raster for SkiaRaster {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn extract(&self, rect: TileRect) -> Result<Self, RenderError> {
        let mut tile = alloc(rect.width, rect.height)?;
        let paint = PixmapPaint {
            blend_mode: BlendMode::Source,
            ..PixmapPaint::default()
        };
        tile.draw_pixmap(
            -(rect.left as i32),
            -(rect.top as i32),
            self.pixmap.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
        Ok(Self { pixmap: tile })
    }

    fn encode(&self) -> Result<Vec<u8>, RenderError> {
        self.pixmap.encode_png().map_err(|_| RenderError::PngEncode)
    }
}

impl Renderer for SkiaRenderer {
    type Raster = SkiaRaster;

    fn render(&self, scene: &Scene) -> Result<SkiaRaster, RenderError> {
        let mut pixmap = alloc(scene.width, scene.height)?;
        if let Some(background) = scene.background {
            pixmap.fill(background);
        }
        let transform = scene.transform.to_skia();
        let mut paint = Paint {
            anti_alias: true,
            ..Paint::default()
        };

        for link in &scene.links {
            let mut pb = PathBuilder::new();
            pb.move_to(link.x1 as f32, link.y1 as f32);
            pb.line_to(link.x2 as f32, link.y2 as f32);
            let Some(path) = pb.finish() else { continue };
            let stroke = Stroke {
                width: link.width as f32,
                line_cap: link.line_cap.into(),
                ..Stroke::default()
            };
            paint.set_color(link.stroke);
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }

        for node in &scene.nodes {
            let Some(circle) =
                PathBuilder::from_circle(node.x as f32, node.y as f32, node.radius as f32)
            else {
                continue;
            };
            paint.set_color(node.fill);
            pixmap.fill_path(&circle, &paint, FillRule::Winding, transform, None);
            if node.stroke_width > 0.0 {
                let stroke = Stroke {
                    width: node.stroke_width as f32,
                    ..Stroke::default()
                };
                paint.set_color(node.stroke);
                pixmap.stroke_path(&circle, &paint, &stroke, transform, None);
            }
        }

        Ok(SkiaRaster { pixmap })
    }
}
