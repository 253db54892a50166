//! The type lattice.
//!
//! Types are value-semantic and structurally compared; [`TypePtr`] is an
//! owning handle and structurally identical types may share one. Every
//! conversion and operator rule lives here as a total function over the
//! closed set of categories, so each rule is a testable property and adding
//! a category is a compile-time exhaustiveness check.

use std::fmt::Write as _;
use std::rc::Rc;

use covenant_compiler_ast::{Ast, BinaryOp, DeclId, Literal, Token, UnaryOp};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

/// Owning handle to a type descriptor.
pub type TypePtr = Rc<Type>;

/// Data location of a reference type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLocation {
    Storage,
    Memory,
    CallData,
}

impl DataLocation {
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Memory => "memory",
            Self::CallData => "calldata",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerModifier {
    Signed,
    Unsigned,
    Hash,
    Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegerType {
    pub bits: u16,
    pub modifier: IntegerModifier,
}

impl IntegerType {
    /// Address types are fixed at 160 bits regardless of the requested
    /// width.
    pub fn new(bits: u16, modifier: IntegerModifier) -> Self {
        debug_assert!(bits > 0 && bits <= 256 && bits % 8 == 0);
        let bits = if modifier == IntegerModifier::Address {
            160
        } else {
            bits
        };
        Self { bits, modifier }
    }

    pub fn address() -> Self {
        Self::new(160, IntegerModifier::Address)
    }

    pub const fn is_address(self) -> bool {
        matches!(self.modifier, IntegerModifier::Address)
    }

    pub const fn is_hash(self) -> bool {
        matches!(self.modifier, IntegerModifier::Hash)
    }

    pub const fn is_signed(self) -> bool {
        matches!(self.modifier, IntegerModifier::Signed)
    }

    fn accepts_binary_operator(self, op: BinaryOp) -> bool {
        if self.is_address() {
            op.is_compare_op()
        } else if self.is_hash() {
            op.is_compare_op() || op.is_bit_op()
        } else {
            op.is_compare_op() || op.is_bit_op() || op.is_shift_op() || op.is_arithmetic_op()
        }
    }

    /// Whether `value` is representable in this integer type.
    fn holds(self, value: &BigInt) -> bool {
        match self.modifier {
            IntegerModifier::Signed => {
                if value.sign() == Sign::Minus {
                    (-value - 1u8).bits() < u64::from(self.bits)
                } else {
                    value.bits() < u64::from(self.bits)
                }
            }
            _ => value.sign() != Sign::Minus && value.bits() <= u64::from(self.bits),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerConstantType {
    pub value: BigInt,
}

impl IntegerConstantType {
    /// The smallest concrete integer type holding the value, if any fits
    /// into 256 bits.
    pub fn integer_type(&self) -> Option<IntegerType> {
        let negative = self.value.sign() == Sign::Minus;
        let significant = if negative {
            (-&self.value - 1u8).bits() + 1
        } else {
            self.value.bits()
        };
        let bits = significant.max(1).div_ceil(8) * 8;
        if bits > 256 {
            return None;
        }
        let modifier = if negative {
            IntegerModifier::Signed
        } else {
            IntegerModifier::Unsigned
        };
        Some(IntegerType::new(bits as u16, modifier))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteralType {
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedBytesType {
    /// Length in bytes, 1..=32.
    pub length: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractType {
    pub declaration: DeclId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructType {
    pub declaration: DeclId,
    pub location: DataLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    Ordinary,
    /// The `bytes` specialization of a byte array.
    Bytes,
    /// The `string` specialization of a byte array.
    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    pub location: DataLocation,
    pub kind: ArrayKind,
    pub base: TypePtr,
    /// `None` for dynamically sized arrays.
    pub length: Option<BigUint>,
}

impl ArrayType {
    pub fn bytes(location: DataLocation) -> Self {
        Self {
            location,
            kind: ArrayKind::Bytes,
            base: Rc::new(Type::FixedBytes(FixedBytesType { length: 1 })),
            length: None,
        }
    }

    pub fn string(location: DataLocation) -> Self {
        Self {
            kind: ArrayKind::String,
            ..Self::bytes(location)
        }
    }

    pub const fn is_byte_array(&self) -> bool {
        matches!(self.kind, ArrayKind::Bytes | ArrayKind::String)
    }

    pub const fn is_dynamically_sized(&self) -> bool {
        self.length.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingType {
    pub key: TypePtr,
    pub value: TypePtr,
}

/// Where a call of this function type executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionLocation {
    Internal,
    External,
    Creation,
    BareCall,
    BareCallCode,
    BareDelegateCall,
    Sha3,
    Suicide,
    ECRecover,
    Sha256,
    Ripemd160,
    Log0,
    Log1,
    Log2,
    Log3,
    Log4,
    Event,
    SetGas,
    SetValue,
    Send,
}

#[derive(Debug, Clone, Eq)]
pub struct FunctionType {
    pub parameter_types: Vec<TypePtr>,
    pub return_parameter_types: Vec<TypePtr>,
    pub parameter_names: Vec<String>,
    pub return_parameter_names: Vec<String>,
    pub location: FunctionLocation,
    /// Variadic built-ins accept any argument list.
    pub arbitrary_parameters: bool,
    pub is_constant: bool,
    pub declaration: Option<DeclId>,
}

impl PartialEq for FunctionType {
    /// Structural identity ignores names and the originating declaration.
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
            && self.arbitrary_parameters == other.arbitrary_parameters
            && self.parameter_types == other.parameter_types
            && self.return_parameter_types == other.return_parameter_types
    }
}

impl FunctionType {
    pub fn new(
        parameter_types: Vec<TypePtr>,
        return_parameter_types: Vec<TypePtr>,
        location: FunctionLocation,
    ) -> Self {
        Self {
            parameter_names: vec![String::new(); parameter_types.len()],
            return_parameter_names: vec![String::new(); return_parameter_types.len()],
            parameter_types,
            return_parameter_types,
            location,
            arbitrary_parameters: false,
            is_constant: false,
            declaration: None,
        }
    }

    pub fn has_equal_argument_types(&self, other: &Self) -> bool {
        self.parameter_types == other.parameter_types
    }

    /// Whether a call with the given positional argument types is
    /// admissible after implicit conversions.
    pub fn can_take_arguments(&self, arguments: &[TypePtr]) -> bool {
        if self.arbitrary_parameters {
            return true;
        }
        arguments.len() == self.parameter_types.len()
            && arguments
                .iter()
                .zip(&self.parameter_types)
                .all(|(argument, parameter)| argument.is_implicitly_convertible_to(parameter))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierType {
    pub parameter_types: Vec<TypePtr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub declaration: DeclId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTypeType {
    pub actual: TypePtr,
}

/// A type descriptor; the closed set of categories of the lattice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Integer(IntegerType),
    IntegerConstant(IntegerConstantType),
    StringLiteral(StringLiteralType),
    Bool,
    FixedBytes(FixedBytesType),
    Contract(ContractType),
    Struct(StructType),
    Array(ArrayType),
    Mapping(MappingType),
    Function(FunctionType),
    Modifier(ModifierType),
    Enum(EnumType),
    /// The type of an expression that *is* a type, e.g. the target of an
    /// explicit conversion or a struct constructor.
    TypeType(TypeTypeType),
    Void,
}

impl Type {
    /// Deterministic mapping from an elementary type keyword to a type.
    pub fn from_elementary_type_name(token: Token) -> TypePtr {
        if let Some(offset) = token.integer_offset() {
            let bits = match offset % 5 {
                0 => 256,
                n => (1u16 << (n - 1)) * 32,
            };
            let modifier = match offset / 5 {
                0 => IntegerModifier::Signed,
                1 => IntegerModifier::Unsigned,
                _ => IntegerModifier::Hash,
            };
            return Rc::new(Self::Integer(IntegerType::new(bits, modifier)));
        }
        if let Some(length) = token.fixed_bytes_length() {
            return Rc::new(Self::FixedBytes(FixedBytesType { length }));
        }
        match token {
            Token::Address => Rc::new(Self::Integer(IntegerType::address())),
            Token::Bool => Rc::new(Self::Bool),
            Token::Bytes => Rc::new(Self::Array(ArrayType::bytes(DataLocation::Storage))),
            Token::String => Rc::new(Self::Array(ArrayType::string(DataLocation::Storage))),
            _ => unreachable!("elementary type token {token:?} not covered"),
        }
    }

    /// The type of a literal, or `None` for a value no type can represent
    /// (propagated as a type error by the caller).
    pub fn for_literal(literal: &Literal) -> Option<TypePtr> {
        match literal {
            Literal::True | Literal::False => Some(Rc::new(Self::Bool)),
            Literal::Number(text) => {
                let value = if let Some(hex) = text.strip_prefix("0x") {
                    BigInt::parse_bytes(hex.as_bytes(), 16)?
                } else {
                    BigInt::parse_bytes(text.as_bytes(), 10)?
                };
                Some(Rc::new(Self::IntegerConstant(IntegerConstantType { value })))
            }
            Literal::String(value) => Some(Rc::new(Self::StringLiteral(StringLiteralType {
                value: value.clone(),
            }))),
        }
    }

    pub fn integer_constant(value: impl Into<BigInt>) -> TypePtr {
        Rc::new(Self::IntegerConstant(IntegerConstantType {
            value: value.into(),
        }))
    }

    pub fn uint256() -> TypePtr {
        Rc::new(Self::Integer(IntegerType::new(
            256,
            IntegerModifier::Unsigned,
        )))
    }

    pub const fn is_reference_type(&self) -> bool {
        matches!(self, Self::Struct(_) | Self::Array(_) | Self::Mapping(_))
    }

    pub const fn is_value_type(&self) -> bool {
        matches!(
            self,
            Self::Integer(_)
                | Self::IntegerConstant(_)
                | Self::Bool
                | Self::FixedBytes(_)
                | Self::Contract(_)
                | Self::Enum(_)
        )
    }

    /// Whether values of this type can be placed in contract storage.
    pub const fn can_be_stored(&self) -> bool {
        !matches!(
            self,
            Self::Function(_)
                | Self::Modifier(_)
                | Self::TypeType(_)
                | Self::Void
                | Self::IntegerConstant(_)
                | Self::StringLiteral(_)
        )
    }

    /// Data location of a reference type; mappings only exist in storage.
    pub fn data_location(&self) -> Option<DataLocation> {
        match self {
            Self::Struct(s) => Some(s.location),
            Self::Array(a) => Some(a.location),
            Self::Mapping(_) => Some(DataLocation::Storage),
            _ => None,
        }
    }

    pub fn data_stored_in(&self, location: DataLocation) -> bool {
        self.data_location() == Some(location)
    }

    /// Whether values of this type can live outside contract storage.
    pub fn can_live_outside_storage(&self, ast: &Ast, annotations: &crate::Annotations) -> bool {
        fn inner(
            ty: &Type,
            ast: &Ast,
            annotations: &crate::Annotations,
            visiting: &mut Vec<DeclId>,
        ) -> bool {
            match ty {
                Type::Mapping(_) => false,
                Type::Array(array) => inner(&array.base, ast, annotations, visiting),
                Type::Struct(st) => {
                    if visiting.contains(&st.declaration) {
                        // Recursive structs are rejected elsewhere; treat
                        // the cycle as storage-bound here.
                        return false;
                    }
                    visiting.push(st.declaration);
                    let ok = ast.struct_def(st.declaration).members.iter().all(|&member| {
                        match &annotations.decl(member).ty {
                            Some(member_ty) => inner(member_ty, ast, annotations, visiting),
                            // An unresolved member type was already reported.
                            None => true,
                        }
                    });
                    visiting.pop();
                    ok
                }
                _ => true,
            }
        }
        inner(self, ast, annotations, &mut Vec::new())
    }

    /// The ABI-facing projection of this type, or `None` when it has no
    /// external form.
    pub fn external_type(&self) -> Option<TypePtr> {
        match self {
            Self::Integer(_) | Self::Bool | Self::FixedBytes(_) => Some(Rc::new(self.clone())),
            Self::IntegerConstant(c) => c
                .integer_type()
                .map(|ty| Rc::new(Self::Integer(ty)) as TypePtr),
            Self::Contract(_) => Some(Rc::new(Self::Integer(IntegerType::address()))),
            Self::Enum(_) => Some(Rc::new(Self::Integer(IntegerType::new(
                8,
                IntegerModifier::Unsigned,
            )))),
            Self::Array(array) if array.is_byte_array() && array.is_dynamically_sized() => {
                Some(Rc::new(self.clone()))
            }
            _ => None,
        }
    }

    /// Canonical ABI name of an external type, used in signatures.
    pub fn abi_name(&self) -> Option<String> {
        match self {
            Self::Integer(i) => Some(match i.modifier {
                IntegerModifier::Signed => format!("int{}", i.bits),
                IntegerModifier::Unsigned => format!("uint{}", i.bits),
                IntegerModifier::Hash => format!("hash{}", i.bits),
                IntegerModifier::Address => "address".to_string(),
            }),
            Self::Bool => Some("bool".to_string()),
            Self::FixedBytes(b) => Some(format!("bytes{}", b.length)),
            Self::Array(a) if a.kind == ArrayKind::Bytes => Some("bytes".to_string()),
            Self::Array(a) if a.kind == ArrayKind::String => Some("string".to_string()),
            _ => None,
        }
    }

    /// The type a `var` declaration initialized from a value of this type
    /// receives. `None` when no storable type exists.
    pub fn mobile_type(&self) -> Option<TypePtr> {
        match self {
            Self::IntegerConstant(c) => c
                .integer_type()
                .map(|ty| Rc::new(Self::Integer(ty)) as TypePtr),
            Self::StringLiteral(_) => None,
            _ => Some(Rc::new(self.clone())),
        }
    }

    /// Implicit conversion per the lattice rules: reflexive, and transitive
    /// along non-narrowing integer widenings.
    pub fn is_implicitly_convertible_to(&self, to: &Type) -> bool {
        match (self, to) {
            (Self::Integer(a), Self::Integer(b)) => {
                if b.bits < a.bits {
                    return false;
                }
                match (a.modifier, b.modifier) {
                    (IntegerModifier::Address, IntegerModifier::Address)
                    | (IntegerModifier::Hash, IntegerModifier::Hash)
                    | (IntegerModifier::Signed, IntegerModifier::Signed)
                    | (IntegerModifier::Unsigned, IntegerModifier::Unsigned) => true,
                    (IntegerModifier::Unsigned, IntegerModifier::Signed) => b.bits > a.bits,
                    _ => false,
                }
            }
            (Self::IntegerConstant(c), Self::Integer(b)) => b.holds(&c.value),
            (Self::IntegerConstant(a), Self::IntegerConstant(b)) => a == b,
            (Self::StringLiteral(s), Self::FixedBytes(b)) => {
                s.value.len() <= usize::from(b.length)
            }
            (Self::StringLiteral(_), Self::Array(a)) => a.is_byte_array(),
            (Self::Contract(a), Self::Contract(b)) => a.declaration == b.declaration,
            (Self::Struct(a), Self::Struct(b)) => a.declaration == b.declaration,
            (Self::Array(a), Self::Array(b)) => {
                if a.kind != b.kind || a.location != b.location {
                    return false;
                }
                if a.is_byte_array() {
                    return true;
                }
                a.base == b.base
                    && (b.length.is_none() || a.length == b.length)
            }
            (Self::Enum(a), Self::Enum(b)) => a.declaration == b.declaration,
            _ => self == to,
        }
    }

    /// Explicit conversion; deliberately not transitive (e.g. bool → uint
    /// and uint → address are allowed, bool → address is not).
    pub fn is_explicitly_convertible_to(&self, to: &Type) -> bool {
        if self.is_implicitly_convertible_to(to) {
            return true;
        }
        match (self, to) {
            (Self::Integer(a), Self::Contract(_)) => a.is_address(),
            (Self::Integer(_), Self::Integer(_))
            | (Self::Integer(_), Self::FixedBytes(_))
            | (Self::IntegerConstant(_), Self::Integer(_))
            | (Self::IntegerConstant(_), Self::FixedBytes(_))
            | (Self::FixedBytes(_), Self::FixedBytes(_))
            | (Self::FixedBytes(_), Self::Integer(_)) => true,
            (Self::Bool, Self::Integer(b)) => !b.is_address(),
            (Self::Contract(_), Self::Integer(b)) => b.is_address(),
            (Self::Enum(_), Self::Integer(b)) => !b.is_address(),
            _ => false,
        }
    }

    /// Result type of a unary operation, or `None` to signal rejection.
    pub fn unary_operator_result(&self, op: UnaryOp) -> Option<TypePtr> {
        match self {
            Self::Integer(i) => match op {
                UnaryOp::Delete => Some(Rc::new(Self::Void)),
                _ if i.is_address() => None,
                UnaryOp::BitNot | UnaryOp::Inc | UnaryOp::Dec | UnaryOp::Plus | UnaryOp::Minus => {
                    Some(Rc::new(self.clone()))
                }
                _ => None,
            },
            Self::IntegerConstant(c) => {
                let value = match op {
                    UnaryOp::Plus => c.value.clone(),
                    UnaryOp::Minus => -&c.value,
                    UnaryOp::BitNot => !&c.value,
                    _ => return None,
                };
                Some(Self::integer_constant(value))
            }
            Self::Bool => match op {
                UnaryOp::Not => Some(Rc::new(Self::Bool)),
                UnaryOp::Delete => Some(Rc::new(Self::Void)),
                _ => None,
            },
            Self::FixedBytes(_) => match op {
                UnaryOp::BitNot => Some(Rc::new(self.clone())),
                UnaryOp::Delete => Some(Rc::new(Self::Void)),
                _ => None,
            },
            Self::Struct(_) | Self::Array(_) | Self::Enum(_) => match op {
                UnaryOp::Delete => Some(Rc::new(Self::Void)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Operand common type of a binary operation, or `None` to signal
    /// rejection. For comparison operators the checker maps the common type
    /// to `bool`; for all other operators the common type is the result.
    pub fn binary_operator_result(&self, op: BinaryOp, other: &TypePtr) -> Option<TypePtr> {
        match (self, other.as_ref()) {
            (Self::Bool, Self::Bool) => {
                if op.is_boolean_op() || op.is_equality_op() {
                    Some(Rc::new(Self::Bool))
                } else {
                    None
                }
            }
            (Self::IntegerConstant(a), Self::IntegerConstant(b)) => {
                if op.is_compare_op() {
                    return Some(Rc::new(self.clone()));
                }
                fold_constants(&a.value, op, &b.value).map(Self::integer_constant)
            }
            (Self::Integer(_), Self::Integer(_))
            | (Self::Integer(_), Self::IntegerConstant(_))
            | (Self::IntegerConstant(_), Self::Integer(_)) => {
                let common = common_integer_type(self, other.as_ref())?;
                match common.as_ref() {
                    Self::Integer(i) if i.accepts_binary_operator(op) => Some(common),
                    _ => None,
                }
            }
            (Self::FixedBytes(a), Self::FixedBytes(b)) => {
                if !(op.is_compare_op() || op.is_bit_op()) {
                    return None;
                }
                let wider = if b.length > a.length { *b } else { *a };
                Some(Rc::new(Self::FixedBytes(wider)))
            }
            (Self::Contract(a), Self::Contract(b)) => {
                (op.is_equality_op() && a.declaration == b.declaration)
                    .then(|| Rc::new(self.clone()))
            }
            (Self::Enum(a), Self::Enum(b)) => {
                (op.is_equality_op() && a.declaration == b.declaration)
                    .then(|| Rc::new(self.clone()))
            }
            _ => None,
        }
    }

    /// Human-readable description used in diagnostics.
    pub fn describe(&self, ast: &Ast) -> String {
        match self {
            Self::Integer(i) => self.abi_name().unwrap_or_else(|| format!("int{}", i.bits)),
            Self::IntegerConstant(c) => format!("int_const {}", c.value),
            Self::StringLiteral(s) => format!("literal_string \"{}\"", s.value),
            Self::Bool => "bool".to_string(),
            Self::FixedBytes(b) => format!("bytes{}", b.length),
            Self::Contract(c) => format!("contract {}", ast.decl(c.declaration).name),
            Self::Struct(s) => format!(
                "struct {} {}",
                ast.decl(s.declaration).name,
                s.location.suffix()
            ),
            Self::Array(a) => {
                let mut out = match a.kind {
                    ArrayKind::Bytes => "bytes".to_string(),
                    ArrayKind::String => "string".to_string(),
                    ArrayKind::Ordinary => {
                        let mut out = a.base.describe(ast);
                        match &a.length {
                            Some(length) => {
                                let _ = write!(out, "[{length}]");
                            }
                            None => out.push_str("[]"),
                        }
                        out
                    }
                };
                let _ = write!(out, " {}", a.location.suffix());
                out
            }
            Self::Mapping(m) => format!(
                "mapping({} => {})",
                m.key.describe(ast),
                m.value.describe(ast)
            ),
            Self::Function(f) => {
                let params: Vec<_> = f.parameter_types.iter().map(|t| t.describe(ast)).collect();
                let returns: Vec<_> = f
                    .return_parameter_types
                    .iter()
                    .map(|t| t.describe(ast))
                    .collect();
                if returns.is_empty() {
                    format!("function ({})", params.join(","))
                } else {
                    format!("function ({}) returns ({})", params.join(","), returns.join(","))
                }
            }
            Self::Modifier(m) => {
                let params: Vec<_> = m.parameter_types.iter().map(|t| t.describe(ast)).collect();
                format!("modifier ({})", params.join(","))
            }
            Self::Enum(e) => format!("enum {}", ast.decl(e.declaration).name),
            Self::TypeType(t) => format!("type({})", t.actual.describe(ast)),
            Self::Void => "void".to_string(),
        }
    }
}

/// Copies a reference type to another data location; all other types are
/// returned unchanged.
pub fn copy_for_location(ty: &TypePtr, location: DataLocation) -> TypePtr {
    match ty.as_ref() {
        Type::Struct(s) => Rc::new(Type::Struct(StructType { location, ..*s })),
        Type::Array(a) => Rc::new(Type::Array(ArrayType {
            location,
            ..a.clone()
        })),
        _ => ty.clone(),
    }
}

/// The type both integer-category operands convert to, if any.
fn common_integer_type(a: &Type, b: &Type) -> Option<TypePtr> {
    if a.is_implicitly_convertible_to(b) {
        return Some(Rc::new(b.clone()));
    }
    if b.is_implicitly_convertible_to(a) {
        return Some(Rc::new(a.clone()));
    }
    None
}

/// Folds a binary operation over two integer constants. `None` rejects the
/// operation (division by zero, oversized shift or exponent).
fn fold_constants(a: &BigInt, op: BinaryOp, b: &BigInt) -> Option<BigInt> {
    match op {
        BinaryOp::Add => Some(a + b),
        BinaryOp::Sub => Some(a - b),
        BinaryOp::Mul => Some(a * b),
        BinaryOp::Div => (!b.is_zero()).then(|| a / b),
        BinaryOp::Mod => (!b.is_zero()).then(|| a % b),
        BinaryOp::Exp => {
            let exponent = b.to_u32()?;
            Some(a.pow(exponent))
        }
        BinaryOp::BitAnd => Some(a & b),
        BinaryOp::BitOr => Some(a | b),
        BinaryOp::BitXor => Some(a ^ b),
        BinaryOp::Shl => {
            let amount = b.to_u32()?;
            Some(a.clone() << amount)
        }
        BinaryOp::Shr => {
            let amount = b.to_u32()?;
            Some(a.clone() >> amount)
        }
        _ => None,
    }
}
