//! Prompt composition.
//!
//! Pure functions that turn a request's options and free text into the
//! system and user instructions handed to an adapter. Unknown frameworks or
//! project types degrade to a default block instead of erroring; the
//! composer is total by design.

use crate::types::GenerationOptions;

// ---------------------------------------------------------------------------
// Framework blocks
// ---------------------------------------------------------------------------

const REACT_BLOCK: &str = "\
React best practices:
- Functional components with hooks; no class components
- Co-locate state, lift only when shared
- Memoize expensive renders with useMemo/useCallback
- Type every prop with a TypeScript interface";

const VUE_BLOCK: &str = "\
Vue best practices:
- Composition API with <script setup>
- Single-file components, scoped styles
- Typed props via defineProps<T>()
- Pinia for shared state";

const NEXTJS_BLOCK: &str = "\
Next.js best practices:
- App Router with server components by default
- 'use client' only where interactivity requires it
- Route handlers for API endpoints
- Metadata exports for SEO";

const LARAVEL_BLOCK: &str = "\
Laravel best practices:
- Thin controllers, fat models discouraged: extract actions/services
- Form request classes for validation
- Eloquent relationships with explicit return types
- Database migrations plus seeders for every schema change";

/// Default for unknown frameworks.
const WEB_FRONTEND_BLOCK: &str = "\
Web frontend best practices:
- Semantic HTML with progressive enhancement
- Component-based structure with clear data flow
- Responsive layout, mobile first
- Strict typing where the target language allows it";

fn framework_block(framework: &str) -> &'static str {
    match framework.to_ascii_lowercase().as_str() {
        "react" => REACT_BLOCK,
        "vue" => VUE_BLOCK,
        "nextjs" | "next" => NEXTJS_BLOCK,
        "laravel" => LARAVEL_BLOCK,
        _ => WEB_FRONTEND_BLOCK,
    }
}

// ---------------------------------------------------------------------------
// Project-type blocks
// ---------------------------------------------------------------------------

const ECOMMERCE_BLOCK: &str = "\
This is an e-commerce project: product listings, cart, checkout flow, and
order management are first-class concerns. Prices are integers in minor
units, never floats.";

const DASHBOARD_BLOCK: &str = "\
This is a dashboard project: data tables, filters, and charts dominate.
Favor virtualized lists for large datasets and keep queries paginated.";

const FULLSTACK_BLOCK: &str = "\
This is a fullstack project: define the API contract first, share types
between client and server, and include both sides of every feature.";

const BLOG_BLOCK: &str = "\
This is a content/blog project: focus on rendering performance, clean
typography, and an author-friendly content model.";

/// Default for unknown project types.
const GENERIC_PROJECT_BLOCK: &str = "\
This is a professional web application: production quality, maintainable
structure, and sensible defaults throughout.";

fn project_type_block(project_type: &str) -> &'static str {
    match project_type.to_ascii_lowercase().as_str() {
        "ecommerce" | "e-commerce" | "shop" => ECOMMERCE_BLOCK,
        "dashboard" | "admin" => DASHBOARD_BLOCK,
        "fullstack" => FULLSTACK_BLOCK,
        "blog" | "cms" => BLOG_BLOCK,
        _ => GENERIC_PROJECT_BLOCK,
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

const CLOSING_GUIDELINES: &str = "\
In all generated code:
- Keep it clean and readable; small focused units
- Full type safety in typed targets
- Handle error and empty states explicitly
- Follow security basics: no secrets in code, escape all output
- Meet accessibility basics: labels, focus order, contrast";

/// Build the system instruction for a request.
///
/// Always non-empty and always contains the framework name verbatim, for any
/// input including unknown frameworks and project types.
pub fn build_system_prompt(options: &GenerationOptions) -> String {
    let mut prompt = format!(
        "You are an expert {} developer generating production-ready code.\n\n",
        options.framework
    );

    prompt.push_str(framework_block(&options.framework));
    prompt.push_str("\n\n");
    prompt.push_str(project_type_block(&options.project_type));
    prompt.push_str("\n\n");

    if !options.features.is_empty() {
        prompt.push_str("Requested features:\n");
        for feature in &options.features {
            prompt.push_str("- ");
            prompt.push_str(feature);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    prompt.push_str(CLOSING_GUIDELINES);
    prompt
}

/// Build the user instruction for a request.
///
/// Embeds the caller's free text plus a fixed delivery checklist. Pure and
/// total like [`build_system_prompt`].
pub fn build_user_prompt(free_text: &str, options: &GenerationOptions) -> String {
    format!(
        "Generate a {} {} for the following request:\n\n{}\n\n\
         Deliver:\n\
         - Complete file structure\n\
         - All components and modules\n\
         - Configuration files\n\
         - Styling\n\
         - Error and loading states\n\
         - Type definitions",
        options.framework,
        if options.project_type.is_empty() {
            "application"
        } else {
            options.project_type.as_str()
        },
        free_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(framework: &str, project_type: &str) -> GenerationOptions {
        GenerationOptions {
            framework: framework.into(),
            project_type: project_type.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_system_prompt_contains_framework_verbatim() {
        for fw in ["react", "vue", "laravel", "nextjs", "some-unknown-fw"] {
            let prompt = build_system_prompt(&options(fw, "dashboard"));
            assert!(!prompt.is_empty());
            assert!(prompt.contains(fw), "missing framework name for {fw}");
        }
    }

    #[test]
    fn test_known_framework_gets_its_block() {
        let prompt = build_system_prompt(&options("laravel", "ecommerce"));
        assert!(prompt.contains("Laravel best practices"));
        assert!(prompt.contains("e-commerce project"));
    }

    #[test]
    fn test_unknown_framework_degrades_to_default_block() {
        let prompt = build_system_prompt(&options("htmx", "webapp"));
        assert!(prompt.contains("Web frontend best practices"));
        assert!(prompt.contains("professional web application"));
    }

    #[test]
    fn test_features_rendered_as_bullets() {
        let mut opts = options("react", "dashboard");
        opts.features = vec!["authentication".into(), "dark mode".into()];
        let prompt = build_system_prompt(&opts);
        assert!(prompt.contains("- authentication\n"));
        assert!(prompt.contains("- dark mode\n"));
    }

    #[test]
    fn test_no_features_no_features_heading() {
        let prompt = build_system_prompt(&options("react", "dashboard"));
        assert!(!prompt.contains("Requested features"));
    }

    #[test]
    fn test_closing_guidelines_always_present() {
        let prompt = build_system_prompt(&options("whatever", ""));
        assert!(prompt.contains("accessibility basics"));
    }

    #[test]
    fn test_user_prompt_embeds_free_text_and_checklist() {
        let prompt = build_user_prompt("a kanban board with drag and drop", &options("vue", "app"));
        assert!(prompt.contains("a kanban board with drag and drop"));
        assert!(prompt.contains("vue"));
        assert!(prompt.contains("Error and loading states"));
        assert!(prompt.contains("Type definitions"));
    }

    #[test]
    fn test_user_prompt_empty_project_type() {
        let prompt = build_user_prompt("anything", &options("react", ""));
        assert!(prompt.contains("react application"));
    }

    #[test]
    fn test_composition_is_pure() {
        let opts = options("react", "blog");
        assert_eq!(build_system_prompt(&opts), build_system_prompt(&opts));
        assert_eq!(
            build_user_prompt("x", &opts),
            build_user_prompt("x", &opts)
        );
    }
}
