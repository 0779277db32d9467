pub mod index;

macros_utils::routes! {
    include health,
    include bleed,
}
