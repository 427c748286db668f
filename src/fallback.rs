//! Deterministic local fallback generator.
//!
//! Produces a plausible, clearly non-AI code skeleton when no vendor call
//! succeeds. Pure and network-free: identical inputs always yield identical
//! output, and nothing here can fail.

/// Maximum prompt excerpt length interpolated into skeletons.
const EXCERPT_LEN: usize = 120;

fn excerpt(prompt: &str) -> &str {
    let trimmed = prompt.trim();
    match trimmed.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}

pub(crate) fn is_php_framework(framework: &str) -> bool {
    framework.eq_ignore_ascii_case("laravel") || framework.eq_ignore_ascii_case("php")
}

pub(crate) fn is_frontend_framework(framework: &str) -> bool {
    matches!(
        framework.to_ascii_lowercase().as_str(),
        "react" | "vue" | "nextjs" | "next" | "svelte" | "angular"
    )
}

/// Synthesize a code skeleton for the given target.
///
/// Dispatches on framework: a PHP/server-side branch, a frontend-component
/// branch, and a generic fallthrough for everything else. The project type
/// and a prompt excerpt are interpolated into a fixed template.
pub fn synthesize(framework: &str, project_type: &str, prompt: &str) -> String {
    let request = excerpt(prompt);

    if is_php_framework(framework) {
        return format!(
            "<?php\n\n\
             namespace App\\Http\\Controllers;\n\n\
             use Illuminate\\Http\\Request;\n\n\
             // Generated {project_type} controller skeleton.\n\
             // Request: {request}\n\
             class GeneratedController extends Controller\n\
             {{\n\
             \x20   public function index()\n\
             \x20   {{\n\
             \x20       return view('generated.index', [\n\
             \x20           'title' => 'Generated {project_type}',\n\
             \x20       ]);\n\
             \x20   }}\n\n\
             \x20   public function store(Request $request)\n\
             \x20   {{\n\
             \x20       $validated = $request->validate([\n\
             \x20           'name' => 'required|string|max:255',\n\
             \x20       ]);\n\n\
             \x20       // TODO: persist $validated\n\
             \x20       return redirect()->route('generated.index');\n\
             \x20   }}\n\
             }}\n"
        );
    }

    if is_frontend_framework(framework) {
        return format!(
            "// Generated {framework} component skeleton for a {project_type}.\n\
             // Request: {request}\n\n\
             import {{ useState }} from 'react';\n\n\
             export interface GeneratedAppProps {{\n\
             \x20 title?: string;\n\
             }}\n\n\
             export default function GeneratedApp({{ title = 'Generated {project_type}' }}: GeneratedAppProps) {{\n\
             \x20 const [loading, setLoading] = useState(false);\n\
             \x20 const [error, setError] = useState<string | null>(null);\n\n\
             \x20 if (error) return <p role=\"alert\">{{error}}</p>;\n\n\
             \x20 return (\n\
             \x20   <main>\n\
             \x20     <h1>{{title}}</h1>\n\
             \x20     {{loading ? <p>Loading...</p> : <p>Ready.</p>}}\n\
             \x20   </main>\n\
             \x20 );\n\
             }}\n"
        );
    }

    format!(
        "// Generated skeleton for a {project_type} ({framework}).\n\
         // Request: {request}\n\n\
         function main() {{\n\
         \x20 console.log('Generated {project_type} starting');\n\
         }}\n\n\
         main();\n"
    )
}

/// Canned code fragments appended during the simulated staged fallback,
/// starting at the third stage. Framework-specific so streamed simulated
/// output looks like the requested target.
pub fn staged_fragments(framework: &str) -> [&'static str; 6] {
    if is_php_framework(framework) {
        return [
            "<?php\n\nnamespace App\\Http\\Controllers;\n\n",
            "use Illuminate\\Http\\Request;\n\nclass GeneratedController extends Controller\n{\n",
            "    public function index()\n    {\n        return view('generated.index');\n    }\n\n",
            "    public function store(Request $request)\n    {\n",
            "        $validated = $request->validate(['name' => 'required|string']);\n",
            "        return redirect()->route('generated.index');\n    }\n}\n",
        ];
    }

    if is_frontend_framework(framework) {
        return [
            "import { useState } from 'react';\n\n",
            "export default function GeneratedApp() {\n",
            "  const [loading, setLoading] = useState(false);\n",
            "  const [error, setError] = useState<string | null>(null);\n\n",
            "  if (error) return <p role=\"alert\">{error}</p>;\n\n",
            "  return <main>{loading ? 'Loading...' : 'Ready.'}</main>;\n}\n",
        ];
    }

    [
        "// Generated application skeleton\n\n",
        "function main() {\n",
        "  const state = { ready: false };\n",
        "  state.ready = true;\n",
        "  console.log('ready', state.ready);\n",
        "}\n\nmain();\n",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_is_deterministic() {
        let a = synthesize("react", "dashboard", "build me a chart panel");
        let b = synthesize("react", "dashboard", "build me a chart panel");
        assert_eq!(a, b);
    }

    #[test]
    fn test_php_branch() {
        let code = synthesize("laravel", "shop", "an order admin");
        assert!(code.starts_with("<?php"));
        assert!(code.contains("GeneratedController"));
        assert!(code.contains("shop"));
        assert!(code.contains("an order admin"));
    }

    #[test]
    fn test_frontend_branch() {
        let code = synthesize("react", "dashboard", "a kpi view");
        assert!(code.contains("export default function GeneratedApp"));
        assert!(code.contains("dashboard"));
        assert!(code.contains("a kpi view"));
    }

    #[test]
    fn test_generic_fallthrough() {
        let code = synthesize("fortran-web", "tool", "whatever");
        assert!(code.contains("function main()"));
        assert!(code.contains("fortran-web"));
    }

    #[test]
    fn test_prompt_excerpt_is_bounded() {
        let long_prompt = "x".repeat(5000);
        let code = synthesize("vue", "app", &long_prompt);
        assert!(code.len() < 2500);
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let prompt = "é".repeat(300);
        // Must not panic on multi-byte boundaries.
        let code = synthesize("react", "app", &prompt);
        assert!(code.contains('é'));
    }

    #[test]
    fn test_staged_fragments_follow_framework() {
        assert!(staged_fragments("laravel")[0].starts_with("<?php"));
        assert!(staged_fragments("react")[0].starts_with("import"));
        assert!(staged_fragments("brainfuck")[0].starts_with("// Generated"));
    }

    #[test]
    fn test_staged_fragments_concatenate_cleanly() {
        let joined: String = staged_fragments("react").concat();
        assert!(joined.contains("GeneratedApp"));
        assert!(joined.ends_with("}\n"));
    }
}
