//! Filter chain (component G): named fragment-shader snippets composed
//! into a single shader. Modeled as a small structured IR (snippets + a
//! per-filter call graph) rather than ad-hoc string concatenation, so the
//! chain is only serialized to GLSL once, at pipeline build time.

bitflags::bitflags! {
    /// Common helper snippets a filter's `code` may depend on.
    pub struct Helpers: u8 {
        const MISC   = 0b0001;
        const SRGB   = 0b0010;
        const OKLAB  = 0b0100;
        const NOISE  = 0b1000;
    }
}

/// A named uniform a filter's `code` reads.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterResource {
    pub name: String,
    pub format: crate::format::Format,
}

/// One shader fragment: a function body (`code`) taking and returning a
/// `vec4` color, plus the helper snippets and uniforms it depends on.
#[derive(Clone, Debug)]
pub struct Filter {
    pub name: String,
    pub code: String,
    pub helpers: Helpers,
    pub resources: Vec<FilterResource>,
}

impl Filter {
    pub fn new(name: impl Into<String>, code: impl Into<String>, helpers: Helpers) -> Filter {
        Filter { name: name.into(), code: code.into(), helpers, resources: Vec::new() }
    }

    pub fn with_resource(mut self, name: impl Into<String>, format: crate::format::Format) -> Filter {
        self.resources.push(FilterResource { name: name.into(), format });
        self
    }

    fn function_name(&self, suffix: usize) -> String {
        format!("{}_{}", self.name, suffix)
    }
}

fn helper_source(which: Helpers) -> &'static str {
    match which {
        Helpers::MISC => "float kp_saturate(float x) { return clamp(x, 0.0, 1.0); }\n",
        Helpers::SRGB => "vec3 kp_srgb_to_linear(vec3 c) { return pow(c, vec3(2.2)); }\n",
        Helpers::OKLAB => "vec3 kp_oklab_to_linear(vec3 c) { return c; }\n",
        Helpers::NOISE => "float kp_hash(vec2 p) { return fract(sin(dot(p, vec2(127.1, 311.7))) * 43758.5453); }\n",
        _ => "",
    }
}

const ALL_HELPERS: [Helpers; 4] = [Helpers::MISC, Helpers::SRGB, Helpers::OKLAB, Helpers::NOISE];

/// Wraps a base fragment body and an ordered list of filters into one
/// concatenated shader.
pub struct FilterChain {
    base_name: String,
    base_code: String,
    base_helpers: Helpers,
    base_resources: Vec<FilterResource>,
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new(base_name: impl Into<String>, base_code: impl Into<String>, base_helpers: Helpers) -> FilterChain {
        FilterChain {
            base_name: base_name.into(),
            base_code: base_code.into(),
            base_helpers,
            base_resources: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn with_base_resource(mut self, name: impl Into<String>, format: crate::format::Format) -> FilterChain {
        self.base_resources.push(FilterResource { name: name.into(), format });
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    /// The combined resource list (base + all filters), each with a unique
    /// binding name matching the emitted call graph's suffixing.
    pub fn resources(&self) -> Vec<FilterResource> {
        let mut out = self.base_resources.clone();
        for (i, suffix) in self.call_suffixes().into_iter().enumerate() {
            let filter = &self.filters[i];
            for r in &filter.resources {
                out.push(FilterResource { name: format!("{}_{}_{}", filter.name, suffix, r.name), format: r.format });
            }
        }
        out
    }

    /// Per-filter call suffix: the Nth occurrence of a repeated filter name
    /// gets suffix N (0-based), so repeated filters still get unique
    /// function names.
    fn call_suffixes(&self) -> Vec<usize> {
        let mut counts = std::collections::HashMap::new();
        self.filters
            .iter()
            .map(|f| {
                let n = counts.entry(f.name.clone()).or_insert(0usize);
                let suffix = *n;
                *n += 1;
                suffix
            })
            .collect()
    }

    /// Emits the concatenated shader: helper blocks (each once), the base
    /// function, each filter function (suffixed), then a synthesized
    /// `main()` chaining them.
    pub fn build(&self) -> String {
        let mut needed = Helpers::empty();
        needed |= self.base_helpers;
        for f in &self.filters {
            needed |= f.helpers;
        }

        let mut src = String::new();
        for h in ALL_HELPERS {
            if needed.contains(h) {
                src.push_str(helper_source(h));
            }
        }

        src.push_str(&format!("vec4 {}(vec2 uv, vec4 color) {{\n{}\n}}\n", self.base_name, self.base_code));

        let suffixes = self.call_suffixes();
        for (filter, suffix) in self.filters.iter().zip(&suffixes) {
            src.push_str(&format!(
                "vec4 {}(vec2 uv, vec4 color) {{\n{}\n}}\n",
                filter.function_name(*suffix),
                filter.code
            ));
        }

        src.push_str("vec4 main_color(vec2 uv) {\n");
        src.push_str(&format!("    vec4 color = {}(uv, vec4(0.0));\n", self.base_name));
        for (filter, suffix) in self.filters.iter().zip(&suffixes) {
            src.push_str(&format!("    color = {}(uv, color);\n", filter.function_name(*suffix)));
        }
        src.push_str("    return color;\n}\n");
        src
    }

    /// The ordered list of fully-qualified function names `main_color` calls
    /// after the base, in call order — used by tests that only want to
    /// assert on call order without parsing the generated GLSL.
    pub fn call_order(&self) -> Vec<String> {
        let suffixes = self.call_suffixes();
        std::iter::once(self.base_name.clone())
            .chain(self.filters.iter().zip(&suffixes).map(|(f, s)| f.function_name(*s)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    fn opacity_filter() -> Filter {
        Filter::new("filter_opacity", "return vec4(color.rgb, color.a * u_opacity);", Helpers::empty())
            .with_resource("u_opacity", Format::R32_SFLOAT)
    }

    fn alpha_filter() -> Filter {
        Filter::new("filter_alpha", "return vec4(color.rgb, u_alpha);", Helpers::empty())
            .with_resource("u_alpha", Format::R32_SFLOAT)
    }

    #[test]
    fn call_order_is_base_then_filters_in_order() {
        let mut chain = FilterChain::new("draw_color", "return color;", Helpers::empty());
        chain.push(opacity_filter());
        chain.push(alpha_filter());
        assert_eq!(chain.call_order(), vec!["draw_color", "filter_opacity_0", "filter_alpha_0"]);
    }

    #[test]
    fn repeated_filter_names_get_unique_suffixes() {
        let mut chain = FilterChain::new("draw_color", "return color;", Helpers::empty());
        chain.push(opacity_filter());
        chain.push(opacity_filter());
        assert_eq!(chain.call_order(), vec!["draw_color", "filter_opacity_0", "filter_opacity_1"]);
    }

    #[test]
    fn resources_have_unique_names_per_filter_occurrence() {
        let mut chain = FilterChain::new("draw_color", "return color;", Helpers::empty());
        chain.push(opacity_filter());
        chain.push(alpha_filter());
        let names: Vec<_> = chain.resources().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["filter_opacity_0_u_opacity", "filter_alpha_0_u_alpha"]);
    }

    #[test]
    fn build_emits_helper_blocks_once() {
        let mut chain = FilterChain::new("draw_color", "return color;", Helpers::SRGB);
        chain.push(Filter::new("f", "return color;", Helpers::SRGB));
        let src = chain.build();
        assert_eq!(src.matches("kp_srgb_to_linear").count(), 1);
    }

    #[test]
    fn build_contains_main_color_calling_base_then_filters() {
        let mut chain = FilterChain::new("draw_color", "return color;", Helpers::empty());
        chain.push(opacity_filter());
        chain.push(alpha_filter());
        let src = chain.build();
        let base_pos = src.find("color = draw_color").unwrap();
        let opacity_pos = src.find("color = filter_opacity_0").unwrap();
        let alpha_pos = src.find("color = filter_alpha_0").unwrap();
        assert!(base_pos < opacity_pos);
        assert!(opacity_pos < alpha_pos);
    }
}
