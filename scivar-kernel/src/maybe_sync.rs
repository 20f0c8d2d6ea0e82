//! Thread-safety bounds that disappear without the `parallel` feature.
//!
//! Kernels and group loops bound their element types and closures by these
//! traits. With `parallel` on they require exactly what rayon needs; with it
//! off every type qualifies, so single-threaded builds accept `Rc`-capturing
//! closures.

macro_rules! maybe_bound {
    ($(#[$doc:meta])* $name:ident: $($bound:tt)+) => {
        $(#[$doc])*
        #[cfg(feature = "parallel")]
        pub trait $name: $($bound)+ {}
        #[cfg(feature = "parallel")]
        impl<T: $($bound)+ + ?Sized> $name for T {}

        $(#[$doc])*
        #[cfg(not(feature = "parallel"))]
        pub trait $name {}
        #[cfg(not(feature = "parallel"))]
        impl<T: ?Sized> $name for T {}
    };
}

maybe_bound!(
    /// `Send` when kernels may run on worker threads.
    MaybeSend: Send
);
maybe_bound!(
    /// `Sync` when kernels may run on worker threads.
    MaybeSync: Sync
);
maybe_bound!(
    /// Element types written by parallel kernels.
    MaybeSendSync: Send + Sync
);

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts_send<T: MaybeSend>() {}
    fn accepts_sync<T: MaybeSync>() {}
    fn accepts_both<T: MaybeSendSync>() {}

    #[test]
    fn test_element_types_qualify() {
        accepts_send::<f64>();
        accepts_sync::<Vec<f64>>();
        accepts_both::<scivar_traits::ValueAndVariance<f32>>();
        accepts_both::<scivar_traits::BinRange>();
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn test_rc_qualifies_when_sequential() {
        accepts_both::<std::rc::Rc<f64>>();
    }
}
