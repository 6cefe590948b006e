//! 内置的 NIfTI-1 单文件 (`.nii` / `.nii.gz`) 解码器.
//!
//! 只解析计算元信息所需的头部字段. 不支持 `.hdr/.img` 双文件格式与 NIfTI-2.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::bufread::MultiGzDecoder;
use ndarray::{Array3, ShapeBuilder};

use super::{spatial_dims, VolumeBackend};
use crate::data::Volume;
use crate::error::LoadError;

const HEADER_SIZE: usize = 348;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// NIfTI-1 头部字段偏移.
mod offsets {
    pub const DIM: usize = 40;
    pub const DATATYPE: usize = 70;
    pub const BITPIX: usize = 72;
    pub const PIXDIM: usize = 76;
    pub const VOX_OFFSET: usize = 108;
    pub const SCL_SLOPE: usize = 112;
    pub const SCL_INTER: usize = 116;
    pub const MAGIC: usize = 344;
}

/// 支持的体素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum DataType {
    UInt8,
    Int8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl DataType {
    fn from_code(code: i16) -> Option<Self> {
        Some(match code {
            2 => Self::UInt8,
            4 => Self::Int16,
            8 => Self::Int32,
            16 => Self::Float32,
            64 => Self::Float64,
            256 => Self::Int8,
            512 => Self::UInt16,
            768 => Self::UInt32,
            1024 => Self::Int64,
            1280 => Self::UInt64,
            _ => return None,
        })
    }

    const fn byte_size(self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    const fn type_name(self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// 将单个体素的字节解码为 `f32`.
    fn decode<E: ByteOrder>(self, b: &[u8]) -> f32 {
        match self {
            Self::UInt8 => b[0] as f32,
            Self::Int8 => b[0] as i8 as f32,
            Self::Int16 => E::read_i16(b) as f32,
            Self::UInt16 => E::read_u16(b) as f32,
            Self::Int32 => E::read_i32(b) as f32,
            Self::UInt32 => E::read_u32(b) as f32,
            Self::Int64 => E::read_i64(b) as f32,
            Self::UInt64 => E::read_u64(b) as f32,
            Self::Float32 => E::read_f32(b),
            Self::Float64 => E::read_f64(b) as f32,
        }
    }
}

/// 解析出的头部字段.
#[derive(Debug)]
struct RawHeader {
    little_endian: bool,
    dims: Vec<usize>,
    datatype: DataType,
    pixdim: [f32; 3],
    vox_offset: usize,
    scl_slope: f32,
    scl_inter: f32,
}

impl RawHeader {
    fn parse(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < HEADER_SIZE {
            return Err(format!(
                "header too short: got {} bytes, need {HEADER_SIZE}",
                bytes.len()
            ));
        }
        // 通过 sizeof_hdr 判断字节序.
        if LittleEndian::read_i32(&bytes[0..4]) == HEADER_SIZE as i32 {
            Self::parse_with::<LittleEndian>(bytes, true)
        } else if BigEndian::read_i32(&bytes[0..4]) == HEADER_SIZE as i32 {
            Self::parse_with::<BigEndian>(bytes, false)
        } else {
            Err("sizeof_hdr is not 348".to_string())
        }
    }

    fn parse_with<E: ByteOrder>(bytes: &[u8], little_endian: bool) -> Result<Self, String> {
        use offsets::*;

        let magic = &bytes[MAGIC..MAGIC + 4];
        if magic != b"n+1\0" {
            return Err(format!("unsupported magic {magic:?} (only single-file NIfTI-1)"));
        }

        let ndim = E::read_i16(&bytes[DIM..DIM + 2]);
        if !(1..=7).contains(&ndim) {
            return Err(format!("ndim must be 1..=7, got {ndim}"));
        }
        let mut dims = Vec::with_capacity(ndim as usize);
        for i in 0..ndim as usize {
            let offset = DIM + 2 + i * 2;
            let d = E::read_i16(&bytes[offset..offset + 2]);
            if d < 0 {
                return Err(format!("dimension {i} has negative value: {d}"));
            }
            dims.push(d as usize);
        }

        let code = E::read_i16(&bytes[DATATYPE..DATATYPE + 2]);
        let datatype =
            DataType::from_code(code).ok_or_else(|| format!("unsupported datatype code {code}"))?;
        let bitpix = E::read_i16(&bytes[BITPIX..BITPIX + 2]);
        if bitpix as usize != datatype.byte_size() * 8 {
            return Err(format!("bitpix {bitpix} does not match datatype {code}"));
        }

        let mut pixdim = [0f32; 3];
        for (i, p) in pixdim.iter_mut().enumerate() {
            let offset = PIXDIM + 4 + i * 4;
            *p = E::read_f32(&bytes[offset..offset + 4]);
        }

        let vox_offset = E::read_f32(&bytes[VOX_OFFSET..VOX_OFFSET + 4]);
        if !vox_offset.is_finite() || vox_offset < HEADER_SIZE as f32 {
            return Err(format!("vox_offset {vox_offset} is not a valid data offset"));
        }
        if vox_offset as usize > bytes.len() {
            return Err(format!(
                "vox_offset {vox_offset} lies beyond the end of the file ({} bytes)",
                bytes.len()
            ));
        }

        Ok(Self {
            little_endian,
            dims,
            datatype,
            pixdim,
            vox_offset: vox_offset as usize,
            scl_slope: E::read_f32(&bytes[SCL_SLOPE..SCL_SLOPE + 4]),
            scl_inter: E::read_f32(&bytes[SCL_INTER..SCL_INTER + 4]),
        })
    }
}

/// 读取文件全部内容, 若为 gzip 格式则自动解压.
fn read_all(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut head = Vec::with_capacity(2);
    (&mut reader).take(2).read_to_end(&mut head)?;

    let mut buf = Vec::new();
    let chained = head.as_slice().chain(reader);
    if head == GZIP_MAGIC {
        MultiGzDecoder::new(BufReader::new(chained)).read_to_end(&mut buf)?;
    } else {
        BufReader::new(chained).read_to_end(&mut buf)?;
    }
    Ok(buf)
}

/// 解码失败原因.
#[derive(Debug)]
enum DecodeError {
    Malformed(String),
    NotThreeDimensional(Vec<usize>),
}

impl From<String> for DecodeError {
    fn from(value: String) -> Self {
        Self::Malformed(value)
    }
}

/// 内置 NIfTI-1 解码后端.
#[derive(Copy, Clone, Debug, Default)]
pub struct RawBackend;

impl RawBackend {
    fn decode(bytes: &[u8]) -> Result<Volume, DecodeError> {
        let header = RawHeader::parse(bytes)?;
        let Some((x, y, z)) = spatial_dims(&header.dims) else {
            return Err(DecodeError::NotThreeDimensional(header.dims));
        };

        let elem = header.datatype.byte_size();
        let end = x
            .checked_mul(y)
            .and_then(|n| n.checked_mul(z))
            .and_then(|n| n.checked_mul(elem))
            .and_then(|n| n.checked_add(header.vox_offset))
            .ok_or_else(|| format!("voxel data size overflows for dims {:?}", header.dims))?;
        if bytes.len() < end {
            return Err(DecodeError::Malformed(format!(
                "voxel data truncated: need {end} bytes, file has {}",
                bytes.len()
            )));
        }
        let raw = &bytes[header.vox_offset..end];

        let dt = header.datatype;
        let mut values: Vec<f32> = if header.little_endian {
            raw.chunks_exact(elem).map(|c| dt.decode::<LittleEndian>(c)).collect()
        } else {
            raw.chunks_exact(elem).map(|c| dt.decode::<BigEndian>(c)).collect()
        };

        // slope 为 0 表示不缩放.
        let (slope, inter) = (header.scl_slope, header.scl_inter);
        if slope != 0.0 && slope.is_finite() && !(slope == 1.0 && inter == 0.0) {
            values.iter_mut().for_each(|v| *v = *v * slope + inter);
        }

        // The nature of nifti data field layout: x 变化最快.
        let data = Array3::from_shape_vec((x, y, z).f(), values)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let spacing = header.pixdim.iter().map(|p| *p as f64).collect();
        Ok(Volume::new(data, spacing, dt.type_name()))
    }
}

impl VolumeBackend for RawBackend {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn load(&self, path: &Path) -> Result<Volume, LoadError> {
        let bytes = read_all(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        let volume = Self::decode(&bytes).map_err(|e| match e {
            DecodeError::NotThreeDimensional(dim) => LoadError::NotThreeDimensional {
                path: path.to_owned(),
                dim,
            },
            DecodeError::Malformed(reason) => LoadError::Malformed {
                path: path.to_owned(),
                reason,
            },
        })?;
        log::debug!("[raw] loaded `{}` {:?}", path.display(), volume.shape());
        Ok(volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 以字节序 `E` 构造一个最小的 NIfTI-1 int16 文件.
    fn tiny_i16_with<E: ByteOrder>(dims: [i16; 3], values: &[i16]) -> Vec<u8> {
        let mut b = vec![0u8; 352];
        E::write_i32(&mut b[0..4], 348);
        E::write_i16(&mut b[40..42], 3);
        for (i, d) in dims.iter().enumerate() {
            E::write_i16(&mut b[42 + i * 2..44 + i * 2], *d);
        }
        E::write_i16(&mut b[70..72], 4);
        E::write_i16(&mut b[72..74], 16);
        for i in 0..3 {
            E::write_f32(&mut b[80 + i * 4..84 + i * 4], 1.0 + i as f32);
        }
        E::write_f32(&mut b[108..112], 352.0);
        b[344..348].copy_from_slice(b"n+1\0");
        for v in values {
            let mut buf = [0u8; 2];
            E::write_i16(&mut buf, *v);
            b.extend_from_slice(&buf);
        }
        b
    }

    /// 构造一个最小的小端 NIfTI-1 int16 文件.
    fn tiny_i16(dims: [i16; 3], values: &[i16]) -> Vec<u8> {
        tiny_i16_with::<LittleEndian>(dims, values)
    }

    #[test]
    fn test_decode_column_major() {
        let bytes = tiny_i16([2, 3, 1], &[0, 1, 2, 3, 4, -5]);
        let v = RawBackend::decode(&bytes).unwrap();
        assert_eq!(v.shape(), (2, 3, 1));
        assert_eq!(v.spacing(), &[1.0, 2.0, 3.0]);
        assert_eq!(v.dtype(), "int16");
        // x 变化最快: (1, 0, 0) 是第二个体素, (0, 1, 0) 是第三个.
        assert_eq!(v[(1, 0, 0)], 1.0);
        assert_eq!(v[(0, 1, 0)], 2.0);
        assert_eq!(v[(1, 2, 0)], -5.0);
        assert_eq!(v.min_max(), Some((-5.0, 4.0)));
    }

    #[test]
    fn test_scaling_applied() {
        let mut bytes = tiny_i16([1, 1, 2], &[1, 2]);
        LittleEndian::write_f32(&mut bytes[112..116], 2.0);
        LittleEndian::write_f32(&mut bytes[116..120], 0.5);
        let v = RawBackend::decode(&bytes).unwrap();
        assert_eq!(v.min_max(), Some((2.5, 4.5)));
    }

    fn malformed_reason(bytes: &[u8]) -> String {
        match RawBackend::decode(bytes) {
            Err(DecodeError::Malformed(reason)) => reason,
            other => panic!("expected a malformed error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_headers() {
        let mut bytes = tiny_i16([1, 1, 1], &[7]);
        bytes[344..348].copy_from_slice(b"BAD!");
        assert!(malformed_reason(&bytes).contains("magic"));

        let mut bytes = tiny_i16([1, 1, 1], &[7]);
        LittleEndian::write_i16(&mut bytes[70..72], 9999);
        assert!(malformed_reason(&bytes).contains("datatype"));

        let bytes = tiny_i16([2, 2, 2], &[1, 2, 3]);
        assert!(malformed_reason(&bytes).contains("truncated"));

        assert!(malformed_reason(&[0u8; 10]).contains("too short"));
    }

    #[test]
    fn test_rejects_four_dimensional_series() {
        let mut bytes = tiny_i16([1, 1, 1], &[7]);
        LittleEndian::write_i16(&mut bytes[40..42], 4);
        LittleEndian::write_i16(&mut bytes[48..50], 3);
        assert!(matches!(
            RawBackend::decode(&bytes),
            Err(DecodeError::NotThreeDimensional(d)) if d == vec![1, 1, 1, 3]
        ));
    }

    #[test]
    fn test_decode_big_endian() {
        let bytes = tiny_i16_with::<BigEndian>([2, 1, 2], &[-2, 1, 258, 3]);
        let v = RawBackend::decode(&bytes).unwrap();
        assert_eq!(v.shape(), (2, 1, 2));
        assert_eq!(v.spacing(), &[1.0, 2.0, 3.0]);
        assert_eq!(v[(0, 0, 1)], 258.0);
        assert_eq!(v.min_max(), Some((-2.0, 258.0)));
    }

    #[test]
    fn test_rejects_out_of_range_vox_offset() {
        for offset in [1e30, f32::INFINITY, f32::NAN, 400.0] {
            let mut bytes = tiny_i16([2, 2, 2], &[1, 2, 3, 4, 5, 6, 7, 8]);
            LittleEndian::write_f32(&mut bytes[108..112], offset);
            assert!(
                malformed_reason(&bytes).contains("vox_offset"),
                "offset {offset}"
            );
        }
    }

    #[test]
    fn test_huge_dims_report_truncation() {
        let mut bytes = tiny_i16([1, 1, 1], &[7]);
        for i in 0..3 {
            LittleEndian::write_i16(&mut bytes[42 + i * 2..44 + i * 2], i16::MAX);
        }
        assert!(malformed_reason(&bytes).contains("truncated"));
    }

    #[test]
    fn test_load_gzip_and_plain_agree() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let bytes = tiny_i16_with::<BigEndian>([2, 1, 2], &[-2, 1, 258, 3]);
        let plain = dir.path().join("a.nii");
        std::fs::write(&plain, &bytes).unwrap();
        let gz = dir.path().join("a.nii.gz");
        let mut enc = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        enc.write_all(&bytes).unwrap();
        enc.finish().unwrap();

        let a = RawBackend.load(&plain).unwrap();
        let b = RawBackend.load(&gz).unwrap();
        assert_eq!(a.data(), b.data());
        assert_eq!(b.min_max(), Some((-2.0, 258.0)));
    }

    #[test]
    fn test_load_error_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken_seg.nii");
        let mut bytes = tiny_i16([2, 2, 2], &[1, 2, 3, 4, 5, 6, 7, 8]);
        LittleEndian::write_f32(&mut bytes[108..112], 1e30);
        std::fs::write(&path, bytes).unwrap();

        let err = RawBackend.load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
        assert!(err.to_string().contains("broken_seg.nii"), "{err}");
    }
}
