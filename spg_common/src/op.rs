//! Operator-forwarding macros for transparent single-field newtypes.

/// Forwards a `std::ops` trait implementation to the inner value of a tuple newtype.
///
/// * `binary` — `Add`, `Sub` and friends (`Self ⊕ Self -> Self`).
/// * `inplace` — `AddAssign`, `SubAssign` and friends (`Self ⊕= Self`).
/// * `unary` — `Neg`, `Not` and friends (`⊕ Self -> Self`).
#[macro_export]
macro_rules! op {
    (binary $type:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $type {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $type:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $type {
            fn $method(&mut self, rhs: Self) {
                std::ops::$trait::$method(&mut self.0, rhs.0)
            }
        }
    };
    (unary $type:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $type {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0))
            }
        }
    };
}
