//! Image embedding
//!
//! Turns JPEG and PNG bytes into PDF image XObjects. JPEG data is embedded
//! as-is behind a `DCTDecode` filter after its frame header has been read;
//! PNG data is decoded, the alpha channel (if any) split into a soft mask, and
//! both planes re-compressed with zlib for `FlateDecode`.

use crate::error::PdfEditError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use std::str::FromStr;

/// Image encodings that can be placed on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Derive the kind from a media type such as `image/png`
    pub fn from_media_type(media_type: &str) -> Result<Self, PdfEditError> {
        let subtype = media_type
            .split(';')
            .next()
            .and_then(|essence| essence.trim().split('/').nth(1))
            .ok_or_else(|| PdfEditError::UnsupportedImageKind(media_type.to_string()))?;
        subtype.parse()
    }

    /// Derive the kind from a file name's extension
    pub fn from_file_name(name: &str) -> Result<Self, PdfEditError> {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .ok_or_else(|| PdfEditError::UnsupportedImageKind(name.to_string()))?;
        ext.parse()
    }
}

impl FromStr for ImageKind {
    type Err = PdfEditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "pjpeg" => Ok(ImageKind::Jpeg),
            "png" => Ok(ImageKind::Png),
            other => Err(PdfEditError::UnsupportedImageKind(other.to_string())),
        }
    }
}

/// Frame header values needed to describe a JPEG to a PDF reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct JpegHeader {
    pub width: u16,
    pub height: u16,
    pub components: u8,
    pub bits_per_component: u8,
}

/// Add an image XObject to `doc` and return its id
pub(crate) fn embed_image(
    doc: &mut Document,
    bytes: &[u8],
    kind: ImageKind,
) -> Result<ObjectId, PdfEditError> {
    match kind {
        ImageKind::Jpeg => embed_jpeg(doc, bytes),
        ImageKind::Png => embed_png(doc, bytes),
    }
}

fn embed_jpeg(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId, PdfEditError> {
    let header = read_jpeg_header(bytes)?;

    let color_space = match header.components {
        1 => "DeviceGray",
        3 => "DeviceRGB",
        4 => "DeviceCMYK",
        n => {
            return Err(PdfEditError::ImageDecode(format!(
                "JPEG has unsupported component count {}",
                n
            )))
        }
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => header.width as i64,
        "Height" => header.height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => header.bits_per_component as i64,
        "Filter" => "DCTDecode",
    };
    if header.components == 4 {
        // Adobe CMYK JPEGs are stored inverted
        let decode = (0..4)
            .flat_map(|_| [Object::Integer(1), Object::Integer(0)])
            .collect::<Vec<_>>();
        dict.set("Decode", Object::Array(decode));
    }

    let mut stream = Stream::new(dict, bytes.to_vec());
    stream.allows_compression = false;
    Ok(doc.add_object(stream))
}

fn embed_png(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId, PdfEditError> {
    let decoded = decode_png(bytes)?;

    let smask = match &decoded.alpha {
        Some(alpha) => {
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => decoded.width as i64,
                "Height" => decoded.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            };
            Some(doc.add_object(flate_stream(dict, alpha)?))
        }
        None => None,
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => decoded.width as i64,
        "Height" => decoded.height as i64,
        "ColorSpace" => decoded.color_space,
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if let Some(smask_id) = smask {
        dict.set("SMask", Object::Reference(smask_id));
    }

    Ok(doc.add_object(flate_stream(dict, &decoded.color)?))
}

fn flate_stream(dict: Dictionary, data: &[u8]) -> Result<Stream, PdfEditError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map(|compressed| {
            let mut stream = Stream::new(dict, compressed);
            stream.allows_compression = false;
            stream
        })
        .map_err(|e| PdfEditError::ImageDecode(format!("Failed to compress image: {}", e)))
}

#[derive(Debug)]
struct DecodedPng {
    width: u32,
    height: u32,
    color_space: &'static str,
    color: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

fn decode_png(bytes: &[u8]) -> Result<DecodedPng, PdfEditError> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::normalize_to_color8());

    let mut reader = decoder
        .read_info()
        .map_err(|e| PdfEditError::ImageDecode(e.to_string()))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| PdfEditError::ImageDecode(e.to_string()))?;
    buf.truncate(frame.buffer_size());

    let (color_space, channels, has_alpha) = match frame.color_type {
        png::ColorType::Grayscale => ("DeviceGray", 1, false),
        png::ColorType::GrayscaleAlpha => ("DeviceGray", 2, true),
        png::ColorType::Rgb => ("DeviceRGB", 3, false),
        png::ColorType::Rgba => ("DeviceRGB", 4, true),
        png::ColorType::Indexed => {
            return Err(PdfEditError::ImageDecode(
                "indexed PNG was not expanded".to_string(),
            ))
        }
    };

    if !has_alpha {
        return Ok(DecodedPng {
            width: frame.width,
            height: frame.height,
            color_space,
            color: buf,
            alpha: None,
        });
    }

    let pixels = (frame.width * frame.height) as usize;
    let mut color = Vec::with_capacity(pixels * (channels - 1));
    let mut alpha = Vec::with_capacity(pixels);
    for px in buf.chunks_exact(channels) {
        color.extend_from_slice(&px[..channels - 1]);
        alpha.push(px[channels - 1]);
    }

    Ok(DecodedPng {
        width: frame.width,
        height: frame.height,
        color_space,
        color,
        alpha: Some(alpha),
    })
}

/// Read the frame header of a JPEG without decoding the scan data
pub(crate) fn read_jpeg_header(data: &[u8]) -> Result<JpegHeader, PdfEditError> {
    const SOI: u8 = 0xD8;
    const EOI: u8 = 0xD9;
    const SOS: u8 = 0xDA;

    let invalid = |msg: &str| PdfEditError::ImageDecode(format!("Invalid JPEG: {}", msg));

    if data.len() < 4 || data[0] != 0xFF || data[1] != SOI {
        return Err(invalid("missing SOI marker"));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            return Err(invalid("expected marker"));
        }
        let marker = data[pos + 1];
        pos += 2;

        // Fill bytes and standalone markers carry no length
        if marker == 0xFF {
            pos -= 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }
        if marker == EOI || marker == SOS {
            break;
        }

        if pos + 2 > data.len() {
            return Err(invalid("segment length missing"));
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        if length < 2 || pos + length > data.len() {
            return Err(invalid("segment extends beyond data"));
        }

        // SOF0..SOF15 except DHT (C4), JPG (C8) and DAC (CC)
        let is_sof = (0xC0..=0xCF).contains(&marker) && ![0xC4, 0xC8, 0xCC].contains(&marker);
        if is_sof {
            if length < 8 {
                return Err(invalid("frame header too short"));
            }
            let header = JpegHeader {
                bits_per_component: data[pos + 2],
                height: u16::from_be_bytes([data[pos + 3], data[pos + 4]]),
                width: u16::from_be_bytes([data[pos + 5], data[pos + 6]]),
                components: data[pos + 7],
            };
            if header.width == 0 || header.height == 0 {
                return Err(invalid("zero image dimension"));
            }
            return Ok(header);
        }

        pos += length;
    }

    Err(invalid("no frame header found"))
}
