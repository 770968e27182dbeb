// THEORY:
// The detector never owns pixels. An `ImageView` is a borrowed, read-only
// window onto a single-channel, one-byte-per-pixel frame owned by the caller
// (a camera grabber, a decoded file, a `image::GrayImage`, ...).
//
// A view knows three things besides the bytes: its size, the distance between
// two rows in the underlying buffer (`stride`), and where its top-left pixel
// sits inside the full frame (`origin`). The origin lets a region of interest
// be scanned on its own while every detected coordinate stays relative to the
// full frame.

use crate::core_modules::error::DetectorError;
use image::GrayImage;

/// A simple struct to represent a 2D pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && ((point.x - self.x) as u64) < self.width as u64
            && ((point.y - self.y) as u64) < self.height as u64
    }

    /// One past the last column.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// One past the last row.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Whether `other` lies completely inside this rectangle.
    pub fn encloses(&self, other: Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A borrowed single-channel 8-bit frame, or a region of one.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
    origin: Point,
}

impl<'a> ImageView<'a> {
    /// A tightly packed, row-major `width x height` frame.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, DetectorError> {
        Self::with_stride(data, width, height, width as usize)
    }

    /// A row-major frame whose rows start `stride` bytes apart.
    pub fn with_stride(
        data: &'a [u8],
        width: u32,
        height: u32,
        stride: usize,
    ) -> Result<Self, DetectorError> {
        if width == 0 || height == 0 {
            return Err(DetectorError::InvalidDimensions { width, height });
        }
        if stride < width as usize {
            return Err(DetectorError::InvalidStride { stride, width });
        }
        // The last row only needs `width` bytes.
        let expected = stride * (height as usize - 1) + width as usize;
        if data.len() < expected {
            return Err(DetectorError::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            origin: Point::default(),
        })
    }

    /// A view of `rect`, given in this view's local coordinates. The returned
    /// view keeps reporting frame coordinates through its origin.
    pub fn roi(&self, rect: Rect) -> Result<ImageView<'a>, DetectorError> {
        if rect.width == 0
            || rect.height == 0
            || rect.right() > self.width as u64
            || rect.bottom() > self.height as u64
        {
            return Err(DetectorError::RoiOutOfBounds {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                image_width: self.width,
                image_height: self.height,
            });
        }
        let offset = rect.y as usize * self.stride + rect.x as usize;
        Ok(ImageView {
            data: &self.data[offset..],
            width: rect.width,
            height: rect.height,
            stride: self.stride,
            origin: Point::new(self.origin.x + rect.x, self.origin.y + rect.y),
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Position of the view's top-left pixel in the full frame.
    #[inline]
    pub fn origin(&self) -> Point {
        self.origin
    }

    /// The frame area covered by this view, in frame coordinates.
    pub fn frame_rect(&self) -> Rect {
        Rect::new(self.origin.x, self.origin.y, self.width, self.height)
    }

    /// Pixels of local row `y`.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize]
    }

    /// Pixel at local coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.stride + x as usize]
    }

    /// Pixel at frame coordinates, or `None` outside the view.
    pub fn get_frame(&self, point: Point) -> Option<u8> {
        if !self.frame_rect().contains(point) {
            return None;
        }
        Some(self.get(point.x - self.origin.x, point.y - self.origin.y))
    }
}

impl<'a> From<&'a GrayImage> for ImageView<'a> {
    fn from(image: &'a GrayImage) -> Self {
        // Always exactly `width * height` bytes; an empty image is rejected
        // by the detector.
        Self {
            data: image.as_raw(),
            width: image.width(),
            height: image.height(),
            stride: image.width() as usize,
            origin: Point::default(),
        }
    }
}
