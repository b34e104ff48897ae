use crate::serialize::EndianCodec;
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Element type tag of a pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl ElementType {
    pub const fn size(self) -> usize {
        match self {
            ElementType::U8 | ElementType::I8 => 1,
            ElementType::U16 | ElementType::I16 => 2,
            ElementType::U32 | ElementType::I32 | ElementType::F32 => 4,
            ElementType::U64 | ElementType::I64 | ElementType::F64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::U8 => "uint8",
            ElementType::I8 => "int8",
            ElementType::U16 => "uint16",
            ElementType::I16 => "int16",
            ElementType::U32 => "uint32",
            ElementType::I32 => "int32",
            ElementType::U64 => "uint64",
            ElementType::I64 => "int64",
            ElementType::F32 => "float",
            ElementType::F64 => "double",
        };
        write!(f, "{}", name)
    }
}

/// Typed storage of one entry. The length is fixed when the entry is created.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolData {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! for_each_variant {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            PoolData::U8($values) => $body,
            PoolData::I8($values) => $body,
            PoolData::U16($values) => $body,
            PoolData::I16($values) => $body,
            PoolData::U32($values) => $body,
            PoolData::I32($values) => $body,
            PoolData::U64($values) => $body,
            PoolData::I64($values) => $body,
            PoolData::F32($values) => $body,
            PoolData::F64($values) => $body,
        }
    };
}

impl PoolData {
    pub fn element_type(&self) -> ElementType {
        match self {
            PoolData::U8(_) => ElementType::U8,
            PoolData::I8(_) => ElementType::I8,
            PoolData::U16(_) => ElementType::U16,
            PoolData::I16(_) => ElementType::I16,
            PoolData::U32(_) => ElementType::U32,
            PoolData::I32(_) => ElementType::I32,
            PoolData::U64(_) => ElementType::U64,
            PoolData::I64(_) => ElementType::I64,
            PoolData::F32(_) => ElementType::F32,
            PoolData::F64(_) => ElementType::F64,
        }
    }

    pub fn len(&self) -> usize {
        for_each_variant!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

mod private {
    pub trait Sealed {}
}

/// Element types that can live in a local pool.
pub trait PoolType:
    EndianCodec + Default + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static + private::Sealed
{
    const ELEMENT_TYPE: ElementType;

    fn slice(data: &PoolData) -> Option<&[Self]>;

    fn slice_mut(data: &mut PoolData) -> Option<&mut [Self]>;

    fn wrap(values: Vec<Self>) -> PoolData;
}

macro_rules! impl_pool_type {
    ($ty:ty, $variant:ident) => {
        impl private::Sealed for $ty {}

        impl PoolType for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;

            fn slice(data: &PoolData) -> Option<&[Self]> {
                match data {
                    PoolData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut PoolData) -> Option<&mut [Self]> {
                match data {
                    PoolData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn wrap(values: Vec<Self>) -> PoolData {
                PoolData::$variant(values)
            }
        }
    };
}

impl_pool_type!(u8, U8);
impl_pool_type!(i8, I8);
impl_pool_type!(u16, U16);
impl_pool_type!(i16, I16);
impl_pool_type!(u32, U32);
impl_pool_type!(i32, I32);
impl_pool_type!(u64, U64);
impl_pool_type!(i64, I64);
impl_pool_type!(f32, F32);
impl_pool_type!(f64, F64);

/// One validity-flagged value cell of a local pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    data: PoolData,
    valid: bool,
}

impl PoolEntry {
    pub fn new<T: PoolType>(initial: &[T], valid: bool) -> Self {
        Self {
            data: T::wrap(initial.to_vec()),
            valid,
        }
    }

    /// Zero-initialized, invalid entry of `len` elements.
    pub fn zeroed<T: PoolType>(len: usize) -> Self {
        let mut values = Vec::with_capacity(len);
        values.resize(len, T::default());
        Self {
            data: T::wrap(values),
            valid: false,
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn data(&self) -> &PoolData {
        &self.data
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut PoolData, &mut bool) {
        (&mut self.data, &mut self.valid)
    }
}

impl fmt::Display for PoolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] valid={} values=",
            self.element_type(),
            self.len(),
            self.valid
        )?;
        for_each_variant!(&self.data, values => write!(f, "{:?}", values))
    }
}
