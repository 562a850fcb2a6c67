//! GeoTIFF access with chunk-granular windowed reads.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use caresite_models::BoundingBox;
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::{RasterError, grid::DensityGrid, transform::PixelTransform};

/// Windowed access to a density raster.
///
/// [`RasterSource`] is the file-backed implementation; the analysis pipeline
/// only needs this seam, so synthetic in-memory grids can stand in for a
/// `GeoTIFF` in tests.
pub trait DensityRead {
    /// Reads the window intersecting `bounds` (the full extent when `None`)
    /// into an owned grid.
    ///
    /// # Errors
    ///
    /// * `RasterError` when the window cannot be read or decoded.
    fn read_window(&mut self, bounds: Option<&BoundingBox>) -> Result<DensityGrid, RasterError>;
}

impl DensityRead for RasterSource {
    fn read_window(&mut self, bounds: Option<&BoundingBox>) -> Result<DensityGrid, RasterError> {
        Self::read_window(self, bounds)
    }
}

/// An open density raster.
///
/// The file handle lives exactly as long as this value; dropping it releases
/// the handle on every exit path, which keeps long batch loops from leaking
/// descriptors. Reads decode only the strips/tiles that intersect the
/// requested window.
pub struct RasterSource {
    decoder: Decoder<BufReader<File>>,
    width: u32,
    height: u32,
    chunk_width: u32,
    chunk_height: u32,
    transform: PixelTransform,
    nodata: Option<f64>,
}

impl RasterSource {
    /// Opens a `GeoTIFF` and reads its georeferencing.
    ///
    /// # Errors
    ///
    /// * `RasterError::Io` when the file cannot be opened.
    /// * `RasterError::Decode` when the TIFF structure is unreadable.
    /// * `RasterError::Unsupported` for multi-band images, rotated
    ///   georeferencing or missing geo tags.
    pub fn open(path: &Path) -> Result<Self, RasterError> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;

        let (width, height) = decoder.dimensions()?;
        let (chunk_width, chunk_height) = decoder.chunk_dimensions();

        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            other => {
                return Err(RasterError::Unsupported {
                    message: format!("expected a single-band raster, got {other:?}"),
                });
            }
        }

        let transform = read_geo_transform(&mut decoder)?;
        let nodata = decoder
            .get_tag_ascii_string(Tag::GdalNodata)
            .ok()
            .and_then(|raw| raw.trim().trim_end_matches('\0').parse::<f64>().ok());

        log::debug!(
            "opened raster {}: {width}x{height} pixels, {chunk_width}x{chunk_height} chunks, nodata {nodata:?}",
            path.display()
        );

        Ok(Self {
            decoder,
            width,
            height,
            chunk_width,
            chunk_height,
            transform,
            nodata,
        })
    }

    /// Raster width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Georeferencing of the full raster.
    #[must_use]
    pub const fn transform(&self) -> &PixelTransform {
        &self.transform
    }

    /// Geographic extent of the full raster.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        extent(&self.transform, self.width, self.height)
    }

    /// Reads the window intersecting `bounds` (the full raster when `None`)
    /// into an owned grid. Bounds outside the raster clamp to its edge; a
    /// disjoint window yields an empty grid.
    ///
    /// # Errors
    ///
    /// * `RasterError::Decode` when a chunk cannot be decoded.
    /// * `RasterError::Unsupported` for pixel formats with no density
    ///   interpretation.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn read_window(&mut self, bounds: Option<&BoundingBox>) -> Result<DensityGrid, RasterError> {
        let window = match bounds {
            None => Some((0, 0, self.width, self.height)),
            Some(bounds) => pixel_window(&self.transform, self.width, self.height, bounds),
        };
        let Some((col0, row0, col1, row1)) = window else {
            log::debug!("requested bounds do not intersect the raster; returning an empty window");
            return DensityGrid::new(
                0,
                0,
                Vec::new(),
                self.transform,
                self.nodata,
            );
        };

        let win_w = (col1 - col0) as usize;
        let win_h = (row1 - row0) as usize;
        let mut pixels = vec![f64::NAN; win_w * win_h];

        let tiles_per_row = self.width.div_ceil(self.chunk_width);
        let tx0 = col0 / self.chunk_width;
        let tx1 = (col1 - 1) / self.chunk_width;
        let ty0 = row0 / self.chunk_height;
        let ty1 = (row1 - 1) / self.chunk_height;

        for ty in ty0..=ty1 {
            for tx in tx0..=tx1 {
                let chunk_index = ty * tiles_per_row + tx;
                let values = chunk_values(self.decoder.read_chunk(chunk_index)?)?;

                let chunk_x0 = tx * self.chunk_width;
                let chunk_y0 = ty * self.chunk_height;
                let data_w = self.chunk_width.min(self.width - chunk_x0);
                let data_h = self.chunk_height.min(self.height - chunk_y0);
                // Decoders clip edge chunks to the image; fall back to the
                // nominal chunk width when this one came back padded.
                let stride = if values.len() == (self.chunk_width as usize) * (self.chunk_height as usize)
                    && data_w != self.chunk_width
                {
                    self.chunk_width as usize
                } else {
                    data_w as usize
                };

                let copy_x0 = col0.max(chunk_x0);
                let copy_x1 = col1.min(chunk_x0 + data_w);
                let copy_y0 = row0.max(chunk_y0);
                let copy_y1 = row1.min(chunk_y0 + data_h);
                if copy_x0 >= copy_x1 {
                    continue;
                }

                for y in copy_y0..copy_y1 {
                    let src = ((y - chunk_y0) as usize) * stride + (copy_x0 - chunk_x0) as usize;
                    let dst = ((y - row0) as usize) * win_w + (copy_x0 - col0) as usize;
                    let len = (copy_x1 - copy_x0) as usize;
                    pixels[dst..dst + len].copy_from_slice(&values[src..src + len]);
                }
            }
        }

        DensityGrid::new(
            win_w,
            win_h,
            pixels,
            self.transform.window(f64::from(col0), f64::from(row0)),
            self.nodata,
        )
    }
}

fn read_geo_transform(decoder: &mut Decoder<BufReader<File>>) -> Result<PixelTransform, RasterError> {
    if let (Ok(scale), Ok(tiepoint)) = (
        decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag),
        decoder.get_tag_f64_vec(Tag::ModelTiepointTag),
    ) {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(RasterError::Unsupported {
                message: "malformed pixel scale or tiepoint tag".to_string(),
            });
        }
        let (sx, sy) = (scale[0], scale[1]);
        if !(sx.is_finite() && sy.is_finite() && sx > 0.0 && sy > 0.0) {
            return Err(RasterError::Unsupported {
                message: format!("unusable pixel scale ({sx}, {sy})"),
            });
        }
        return Ok(PixelTransform {
            origin_x: tiepoint[0].mul_add(-sx, tiepoint[3]),
            origin_y: tiepoint[1].mul_add(sy, tiepoint[4]),
            pixel_width: sx,
            pixel_height: -sy,
        });
    }

    if let Ok(matrix) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if matrix.len() >= 8 && matrix[1] == 0.0 && matrix[4] == 0.0 {
            return Ok(PixelTransform {
                origin_x: matrix[3],
                origin_y: matrix[7],
                pixel_width: matrix[0],
                pixel_height: matrix[5],
            });
        }
        return Err(RasterError::Unsupported {
            message: "rotated model transformation".to_string(),
        });
    }

    Err(RasterError::Unsupported {
        message: "no georeferencing tags".to_string(),
    })
}

/// Clamped pixel window covering `bounds`, as (col0, row0, col1, row1) with
/// exclusive upper indices, or `None` when disjoint from the raster.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_window(
    transform: &PixelTransform,
    width: u32,
    height: u32,
    bounds: &BoundingBox,
) -> Option<(u32, u32, u32, u32)> {
    let cols = [transform.col_of_x(bounds.west), transform.col_of_x(bounds.east)];
    let rows = [transform.row_of_y(bounds.south), transform.row_of_y(bounds.north)];

    let col0 = cols[0].min(cols[1]).floor().max(0.0);
    let col1 = cols[0].max(cols[1]).ceil().min(f64::from(width));
    let row0 = rows[0].min(rows[1]).floor().max(0.0);
    let row1 = rows[0].max(rows[1]).ceil().min(f64::from(height));

    if col0 >= col1 || row0 >= row1 {
        return None;
    }
    Some((col0 as u32, row0 as u32, col1 as u32, row1 as u32))
}

#[allow(clippy::cast_precision_loss)]
fn chunk_values(decoded: DecodingResult) -> Result<Vec<f64>, RasterError> {
    Ok(match decoded {
        DecodingResult::U8(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::U16(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::U32(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::U64(values) => values.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I16(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::I32(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::F32(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::F64(values) => values,
        _ => {
            return Err(RasterError::Unsupported {
                message: "pixel sample format has no density interpretation".to_string(),
            });
        }
    })
}

fn extent(transform: &PixelTransform, width: u32, height: u32) -> BoundingBox {
    let (x0, y0) = transform.corner(0.0, 0.0);
    let (x1, y1) = transform.corner(f64::from(width), f64::from(height));
    BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
}
