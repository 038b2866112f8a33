//! Memory layout of struct values.
//!
//! Fields are laid out in declaration order, each at the next offset
//! aligned to its natural alignment. The struct size is rounded up to the
//! largest field alignment. Struct values themselves are `i32` addresses.

use crate::hir::{HirModule, HirStruct};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub offset: u32,
    pub size: u32,
    pub align: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub fields: Vec<FieldLayout>,
    pub size: u32,
    pub align: u32,
}

/// Size and alignment of a value of `ty` when stored in memory.
pub fn size_align(ty: &Type) -> (u32, u32) {
    match ty {
        Type::I64 | Type::F64 => (8, 8),
        _ => (4, 4),
    }
}

pub fn align_to(value: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

pub fn layout_struct(def: &HirStruct) -> StructLayout {
    let mut offset = 0;
    let mut max_align = 1;
    let fields = def
        .fields
        .iter()
        .map(|field| {
            let (size, align) = size_align(&field.ty);
            let field_offset = align_to(offset, align);
            offset = field_offset + size;
            max_align = max_align.max(align);
            FieldLayout {
                offset: field_offset,
                size,
                align,
            }
        })
        .collect();
    StructLayout {
        fields,
        size: align_to(offset, max_align),
        align: max_align,
    }
}

/// Layouts of every struct in a module, indexed by `StructId`.
pub fn layout_module(module: &HirModule) -> Vec<StructLayout> {
    module.structs.iter().map(layout_struct).collect()
}
