// crates/model-gate-core/src/bytecode/class_file.rs
// ============================================================================
// Module: Model Gate Class File Parser
// Description: Bounded reader for compiled class files.
// Purpose: Derive a read-only class descriptor and constant-pool references.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The parser reads the class-file layout front to back: header, constant
//! pool, type header, interfaces, fields, methods, attributes. Every read is
//! bounds-checked and every constant-pool index is validated against the
//! expected constant kind, so a descriptor only exists for a structurally
//! sound class. Bytecode is never interpreted or loaded.
//! Security posture: class bytes are untrusted; failures carry the byte
//! offset where parsing stopped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Class-file magic number.
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;
/// Oldest supported major version.
pub const MIN_MAJOR_VERSION: u16 = 45;
/// Newest supported major version.
pub const MAX_MAJOR_VERSION: u16 = 69;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Class-file parse failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassParseError {
    /// Input ended before a complete structure was read.
    #[error("truncated class file at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Offset of the incomplete read.
        offset: usize,
        /// Bytes the read required.
        needed: usize,
        /// Bytes remaining.
        available: usize,
    },
    /// Magic number mismatch.
    #[error("bad magic number 0x{got:08X} at offset 0 (expected 0x{expected:08X})")]
    BadMagic {
        /// Expected magic.
        expected: u32,
        /// Magic found.
        got: u32,
    },
    /// Major version outside the supported range.
    #[error("unsupported class file version {major}.{minor} at offset 4")]
    UnsupportedVersion {
        /// Major version.
        major: u16,
        /// Minor version.
        minor: u16,
    },
    /// Constant-pool tag the format does not define.
    #[error("unknown constant pool tag {tag} at offset {offset}")]
    UnknownConstantTag {
        /// Tag byte.
        tag: u8,
        /// Offset of the tag.
        offset: usize,
    },
    /// Constant-pool index that is out of range or names the wrong kind.
    #[error("invalid constant pool index {index} at offset {offset}: expected {expected}")]
    BadConstantIndex {
        /// Referenced index.
        index: u16,
        /// Offset of the referencing structure.
        offset: usize,
        /// Expected constant kind.
        expected: &'static str,
    },
    /// Malformed modified UTF-8 text.
    #[error("malformed modified UTF-8 constant at offset {offset}")]
    BadUtf8 {
        /// Offset of the constant.
        offset: usize,
    },
    /// Bytes remain after the final attribute table.
    #[error("extra bytes at the end of class file at offset {offset}")]
    TrailingBytes {
        /// Offset of the first extra byte.
        offset: usize,
    },
}

// ============================================================================
// SECTION: Constant Pool
// ============================================================================

/// One constant-pool entry with the indexes it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Slot 0, and the slot following an 8-byte numeric constant.
    Unusable,
    /// Text.
    Utf8(String),
    /// Integer, float, long, or double literal.
    Numeric,
    /// Class or array type.
    Class {
        /// Index of the name.
        name: u16,
    },
    /// String literal.
    String {
        /// Index of the text.
        value: u16,
    },
    /// Field reference.
    FieldRef {
        /// Index of the owning class.
        class: u16,
        /// Index of the name and type.
        name_and_type: u16,
    },
    /// Method reference.
    MethodRef {
        /// Index of the owning class.
        class: u16,
        /// Index of the name and type.
        name_and_type: u16,
    },
    /// Interface method reference.
    InterfaceMethodRef {
        /// Index of the owning interface.
        class: u16,
        /// Index of the name and type.
        name_and_type: u16,
    },
    /// Member name and descriptor.
    NameAndType {
        /// Index of the name.
        name: u16,
        /// Index of the descriptor.
        descriptor: u16,
    },
    /// Method handle.
    MethodHandle {
        /// Reference kind.
        kind: u8,
        /// Index of the referenced member.
        reference: u16,
    },
    /// Method type.
    MethodType {
        /// Index of the descriptor.
        descriptor: u16,
    },
    /// Dynamically computed constant or call site.
    Dynamic {
        /// Bootstrap method index (into the attribute table, not the pool).
        bootstrap: u16,
        /// Index of the name and type.
        name_and_type: u16,
    },
    /// Module or package name.
    ModuleOrPackage {
        /// Index of the name.
        name: u16,
    },
}

/// Parsed constant pool; index 0 is unusable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantPool {
    /// Entries with the offset each was read from.
    entries: Vec<(Constant, usize)>,
}

impl ConstantPool {
    /// Returns the constant at `index`.
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(usize::from(index)).map(|(constant, _)| constant)
    }

    /// Resolves a text constant.
    fn utf8(&self, index: u16, offset: usize) -> Result<&str, ClassParseError> {
        match self.get(index) {
            Some(Constant::Utf8(text)) => Ok(text),
            _ => Err(bad_index(index, offset, "Utf8")),
        }
    }

    /// Resolves a class constant to its name.
    fn class_name(&self, index: u16, offset: usize) -> Result<&str, ClassParseError> {
        match self.get(index) {
            Some(Constant::Class {
                name,
            }) => self.utf8(*name, offset),
            _ => Err(bad_index(index, offset, "Class")),
        }
    }

    /// Resolves a name-and-type constant.
    fn name_and_type(&self, index: u16, offset: usize) -> Result<(&str, &str), ClassParseError> {
        match self.get(index) {
            Some(Constant::NameAndType {
                name,
                descriptor,
            }) => Ok((self.utf8(*name, offset)?, self.utf8(*descriptor, offset)?)),
            _ => Err(bad_index(index, offset, "NameAndType")),
        }
    }

    /// Resolves a member reference to owner, name, and descriptor.
    fn member(
        &self,
        class: u16,
        name_and_type: u16,
        offset: usize,
    ) -> Result<MemberRef, ClassParseError> {
        let owner = self.class_name(class, offset)?;
        let (name, descriptor) = self.name_and_type(name_and_type, offset)?;
        Ok(MemberRef {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    /// Resolves every class and member reference in pool order.
    fn references(&self) -> Result<Vec<PoolReference>, ClassParseError> {
        let mut references = Vec::new();
        for (constant, offset) in &self.entries {
            let offset = *offset;
            let reference = match constant {
                Constant::Class {
                    name,
                } => PoolReference::Class(self.utf8(*name, offset)?.to_string()),
                Constant::FieldRef {
                    class,
                    name_and_type,
                } => PoolReference::Field(self.member(*class, *name_and_type, offset)?),
                Constant::MethodRef {
                    class,
                    name_and_type,
                } => PoolReference::Method(self.member(*class, *name_and_type, offset)?),
                Constant::InterfaceMethodRef {
                    class,
                    name_and_type,
                } => PoolReference::InterfaceMethod(self.member(*class, *name_and_type, offset)?),
                Constant::Unusable
                | Constant::Utf8(_)
                | Constant::Numeric
                | Constant::String {
                    ..
                }
                | Constant::NameAndType {
                    ..
                }
                | Constant::MethodHandle {
                    ..
                }
                | Constant::MethodType {
                    ..
                }
                | Constant::Dynamic {
                    ..
                }
                | Constant::ModuleOrPackage {
                    ..
                } => continue,
            };
            references.push(reference);
        }
        Ok(references)
    }
}

/// Resolved member reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    /// Owning class in internal form.
    pub owner: String,
    /// Member name.
    pub name: String,
    /// Member descriptor.
    pub descriptor: String,
}

impl MemberRef {
    /// Returns `"<owner>.<name>"`.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }
}

/// Class and member references declared in the constant pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolReference {
    /// Class or array type.
    Class(String),
    /// Field reference.
    Field(MemberRef),
    /// Method reference.
    Method(MemberRef),
    /// Interface method reference.
    InterfaceMethod(MemberRef),
}

// ============================================================================
// SECTION: Descriptor
// ============================================================================

/// Declared method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Method name.
    pub name: String,
    /// Method descriptor, byte-identical to the class file.
    pub descriptor: String,
    /// Access flags.
    pub access_flags: u16,
}

/// Read-only view of one class.
///
/// # Invariants
/// - Names use the internal slash form.
/// - `interfaces` and `methods` keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Class name.
    pub type_name: String,
    /// Superclass name; absent only for the root class.
    pub super_name: Option<String>,
    /// Declared interfaces.
    pub interfaces: Vec<String>,
    /// Declared methods.
    pub methods: Vec<MethodInfo>,
    /// `"<major>.<minor>"`.
    pub format_version: String,
}

/// Parsed class: descriptor plus resolved pool references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedClass {
    /// Descriptor.
    pub descriptor: ClassDescriptor,
    /// References in constant-pool order.
    pub references: Vec<PoolReference>,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a class file and returns its descriptor.
///
/// # Errors
///
/// Returns [`ClassParseError`] for any malformed or unsupported input.
pub fn class_info(bytes: &[u8]) -> Result<ClassDescriptor, ClassParseError> {
    parse_class(bytes).map(|parsed| parsed.descriptor)
}

/// Parses a class file into its descriptor and resolved references.
///
/// # Errors
///
/// Returns [`ClassParseError`] for any malformed or unsupported input.
pub fn parse_class(bytes: &[u8]) -> Result<ParsedClass, ClassParseError> {
    let mut reader = ByteReader::new(bytes);
    let magic = reader.u32()?;
    if magic != CLASS_MAGIC {
        return Err(ClassParseError::BadMagic {
            expected: CLASS_MAGIC,
            got: magic,
        });
    }
    let minor = reader.u16()?;
    let major = reader.u16()?;
    if !(MIN_MAJOR_VERSION ..= MAX_MAJOR_VERSION).contains(&major) {
        return Err(ClassParseError::UnsupportedVersion {
            major,
            minor,
        });
    }
    let pool = read_constant_pool(&mut reader)?;

    let _access_flags = reader.u16()?;
    let offset = reader.offset();
    let type_name = pool.class_name(reader.u16()?, offset)?.to_string();
    let offset = reader.offset();
    let super_index = reader.u16()?;
    let super_name = if super_index == 0 {
        None
    } else {
        Some(pool.class_name(super_index, offset)?.to_string())
    };

    let interface_count = reader.u16()?;
    let mut interfaces = Vec::with_capacity(usize::from(interface_count));
    for _ in 0 .. interface_count {
        let offset = reader.offset();
        interfaces.push(pool.class_name(reader.u16()?, offset)?.to_string());
    }

    let field_count = reader.u16()?;
    for _ in 0 .. field_count {
        read_member(&mut reader, &pool)?;
    }

    let method_count = reader.u16()?;
    let mut methods = Vec::with_capacity(usize::from(method_count));
    for _ in 0 .. method_count {
        methods.push(read_member(&mut reader, &pool)?);
    }

    skip_attributes(&mut reader, &pool)?;
    if reader.remaining() > 0 {
        return Err(ClassParseError::TrailingBytes {
            offset: reader.offset(),
        });
    }

    let references = pool.references()?;
    Ok(ParsedClass {
        descriptor: ClassDescriptor {
            type_name,
            super_name,
            interfaces,
            methods,
            format_version: format!("{major}.{minor}"),
        },
        references,
    })
}

/// Reads the constant pool.
fn read_constant_pool(reader: &mut ByteReader<'_>) -> Result<ConstantPool, ClassParseError> {
    let count = usize::from(reader.u16()?);
    let mut entries = Vec::with_capacity(count.max(1));
    entries.push((Constant::Unusable, reader.offset()));
    while entries.len() < count {
        let offset = reader.offset();
        let tag = reader.u8()?;
        let constant = match tag {
            1 => {
                let length = usize::from(reader.u16()?);
                let raw = reader.take(length)?;
                Constant::Utf8(
                    decode_modified_utf8(raw).ok_or(ClassParseError::BadUtf8 {
                        offset,
                    })?,
                )
            }
            3 | 4 => {
                reader.take(4)?;
                Constant::Numeric
            }
            5 | 6 => {
                reader.take(8)?;
                entries.push((Constant::Numeric, offset));
                Constant::Unusable
            }
            7 => Constant::Class {
                name: reader.u16()?,
            },
            8 => Constant::String {
                value: reader.u16()?,
            },
            9 => Constant::FieldRef {
                class: reader.u16()?,
                name_and_type: reader.u16()?,
            },
            10 => Constant::MethodRef {
                class: reader.u16()?,
                name_and_type: reader.u16()?,
            },
            11 => Constant::InterfaceMethodRef {
                class: reader.u16()?,
                name_and_type: reader.u16()?,
            },
            12 => Constant::NameAndType {
                name: reader.u16()?,
                descriptor: reader.u16()?,
            },
            15 => Constant::MethodHandle {
                kind: reader.u8()?,
                reference: reader.u16()?,
            },
            16 => Constant::MethodType {
                descriptor: reader.u16()?,
            },
            17 | 18 => Constant::Dynamic {
                bootstrap: reader.u16()?,
                name_and_type: reader.u16()?,
            },
            19 | 20 => Constant::ModuleOrPackage {
                name: reader.u16()?,
            },
            _ => {
                return Err(ClassParseError::UnknownConstantTag {
                    tag,
                    offset,
                });
            }
        };
        entries.push((constant, offset));
    }
    if entries.len() > count.max(1) {
        let last = u16::try_from(count.saturating_sub(1)).unwrap_or(u16::MAX);
        return Err(bad_index(last, reader.offset(), "room for an 8-byte constant"));
    }
    Ok(ConstantPool {
        entries,
    })
}

/// Reads one field or method entry.
fn read_member(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<MethodInfo, ClassParseError> {
    let access_flags = reader.u16()?;
    let offset = reader.offset();
    let name = pool.utf8(reader.u16()?, offset)?.to_string();
    let offset = reader.offset();
    let descriptor = pool.utf8(reader.u16()?, offset)?.to_string();
    skip_attributes(reader, pool)?;
    Ok(MethodInfo {
        name,
        descriptor,
        access_flags,
    })
}

/// Skips an attribute table, validating attribute names.
fn skip_attributes(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<(), ClassParseError> {
    let count = reader.u16()?;
    for _ in 0 .. count {
        let offset = reader.offset();
        pool.utf8(reader.u16()?, offset)?;
        let length = reader.u32()?;
        let length = usize::try_from(length).map_err(|_| ClassParseError::Truncated {
            offset: reader.offset(),
            needed: usize::MAX,
            available: reader.remaining(),
        })?;
        reader.take(length)?;
    }
    Ok(())
}

/// Builds a bad-index error.
const fn bad_index(index: u16, offset: usize, expected: &'static str) -> ClassParseError {
    ClassParseError::BadConstantIndex {
        index,
        offset,
        expected,
    }
}

/// Decodes the class-file variant of UTF-8 (two-byte NUL, surrogate pairs).
fn decode_modified_utf8(raw: &[u8]) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(raw.len());
    let mut index = 0usize;
    while index < raw.len() {
        let first = u16::from(raw[index]);
        if first & 0x80 == 0 {
            if first == 0 {
                return None;
            }
            units.push(first);
            index += 1;
        } else if first & 0xE0 == 0xC0 {
            let second = u16::from(*raw.get(index + 1)?);
            if second & 0xC0 != 0x80 {
                return None;
            }
            units.push(((first & 0x1F) << 6) | (second & 0x3F));
            index += 2;
        } else if first & 0xF0 == 0xE0 {
            let second = u16::from(*raw.get(index + 1)?);
            let third = u16::from(*raw.get(index + 2)?);
            if second & 0xC0 != 0x80 || third & 0xC0 != 0x80 {
                return None;
            }
            units.push(((first & 0x0F) << 12) | ((second & 0x3F) << 6) | (third & 0x3F));
            index += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}

// ============================================================================
// SECTION: Byte Reader
// ============================================================================

/// Big-endian cursor over class bytes.
struct ByteReader<'a> {
    /// Input.
    bytes: &'a [u8],
    /// Cursor.
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader at offset 0.
    const fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
        }
    }

    /// Current offset.
    const fn offset(&self) -> usize {
        self.pos
    }

    /// Bytes not yet read.
    const fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    /// Reads `length` bytes.
    fn take(&mut self, length: usize) -> Result<&'a [u8], ClassParseError> {
        let available = self.remaining();
        if length > available {
            return Err(ClassParseError::Truncated {
                offset: self.pos,
                needed: length,
                available,
            });
        }
        let bytes = self.bytes;
        let slice = &bytes[self.pos .. self.pos + length];
        self.pos += length;
        Ok(slice)
    }

    /// Reads one byte.
    fn u8(&mut self) -> Result<u8, ClassParseError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a big-endian `u16`.
    fn u16(&mut self) -> Result<u16, ClassParseError> {
        let raw = self.take(2)?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    /// Reads a big-endian `u32`.
    fn u32(&mut self) -> Result<u32, ClassParseError> {
        let raw = self.take(4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }
}
