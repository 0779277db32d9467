//! Small declarative helpers shared by the HTTP binaries.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub use actix_web;

/// Generates a `routes` function suitable for `App::configure`.
///
/// Two forms are accepted. Listing handlers registers each one as a service:
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
/// }
/// ```
///
/// Listing child modules chains their own `routes` functions, in order:
///
/// ```ignore
/// macros_utils::routes! {
///     include health,
///     include bleed,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($(route $route:ident),+ $(,)?) => {
        pub fn routes(cfg: &mut $crate::actix_web::web::ServiceConfig) {
            $( cfg.service($route); )+
        }
    };
    ($(include $module:ident),+ $(,)?) => {
        $( pub mod $module; )+

        pub fn routes(cfg: &mut $crate::actix_web::web::ServiceConfig) {
            $( $module::routes(cfg); )+
        }
    };
}
