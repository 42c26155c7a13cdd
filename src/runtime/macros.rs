//! Declarative generation of instruction sets
//!
//! `instruction_set!` turns a list of instruction signatures into the
//! instruction value model: one struct per instruction, the closed enum
//! over them, and a handler trait requiring one [`Handle`] impl per
//! variant. Every handler type implementing all of those operations
//! implements the generated trait automatically.
//!
//! ```
//! reify::instruction_set! {
//!     /// Reservation effects
//!     pub enum Booking {
//!         handler BookingHandler;
//!         /// Load every reservation on a date
//!         ReadReservations(date: String) -> Vec<String>;
//!         /// Persist a reservation, returning its id
//!         CreateReservation(name: String, seats: u32) -> u64;
//!     }
//! }
//!
//! let request = CreateReservation::new("ada".into(), 2);
//! assert_eq!(request.seats, 2);
//! ```
//!
//! Parameter types must implement `Debug` and `Send`. The field name
//! `result_cell` is reserved.
//!
//! [`Handle`]: crate::Handle

/// Generate an instruction set, its variant structs and its handler trait.
#[macro_export]
macro_rules! instruction_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $set:ident {
            $(#[$hmeta:meta])*
            handler $handler:ident;
            $(
                $(#[$vmeta:meta])*
                $variant:ident ( $( $field:ident : $fty:ty ),* $(,)? ) -> $out:ty;
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis enum $set {
            $(
                #[allow(missing_docs)]
                $variant($variant),
            )+
        }

        $(
            $(#[$vmeta])*
            $vis struct $variant {
                $(
                    #[allow(missing_docs)]
                    pub $field: $fty,
                )*
                result_cell: ::std::sync::Arc<$crate::ResultCell<$out>>,
            }

            impl $variant {
                /// Request this instruction with the given parameters
                #[allow(clippy::new_without_default)]
                pub fn new($( $field: $fty ),*) -> Self {
                    Self {
                        $( $field, )*
                        result_cell: ::std::sync::Arc::new($crate::ResultCell::new()),
                    }
                }
            }

            impl ::std::fmt::Debug for $variant {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    f.debug_struct(stringify!($variant))
                        $( .field(stringify!($field), &self.$field) )*
                        .finish()
                }
            }

            impl $crate::Instruction for $variant {
                const NAME: &'static str = stringify!($variant);
                type Output = $out;
                type Set = $set;

                fn result_cell(&self) -> &::std::sync::Arc<$crate::ResultCell<$out>> {
                    &self.result_cell
                }

                fn descriptor() -> $crate::schema::InstructionDescriptor {
                    $crate::schema::InstructionDescriptor::new(
                        stringify!($variant),
                        stringify!($out),
                        vec![$( $crate::schema::Parameter::new(stringify!($fty), stringify!($field)) ),*],
                    )
                }
            }

            impl ::std::convert::From<$variant> for $set {
                fn from(instruction: $variant) -> Self {
                    $set::$variant(instruction)
                }
            }
        )+

        $(#[$hmeta])*
        $vis trait $handler: $( $crate::Handle<$variant> + )+ {}

        impl<H: $( $crate::Handle<$variant> + )+ ?Sized> $handler for H {}

        impl $crate::InstructionSet for $set {
            const BASE_NAME: &'static str = stringify!($set);

            fn name(&self) -> &'static str {
                match self {
                    $( $set::$variant(_) => stringify!($variant), )+
                }
            }

            fn schema() -> $crate::schema::Schema {
                $crate::schema::Schema::new(
                    stringify!($set),
                    vec![$( <$variant as $crate::Instruction>::descriptor() ),+],
                )
            }
        }

        impl<H: $handler + ?Sized> $crate::Accept<H> for $set {
            async fn accept(&self, handler: &mut H) -> $crate::ExecResult<()> {
                match self {
                    $( $set::$variant(instruction) => $crate::dispatch(instruction, handler).await, )+
                }
            }
        }
    };
}
