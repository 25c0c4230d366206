//! Authentication: JWT base module, then optional passport and OAuth layers.
//!
//! The base layer writes `src/auth.<ext>` and `src/routes/auth.<ext>`, both
//! carrying their own extension points. The passport and OAuth layers never
//! rewrite those files; they insert strategies and routes at the
//! `auth-strategies`, `auth-routes` and `imports` points, so each layer
//! extends whatever the previous one produced.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::application::composer::{GenerationContext, Generator, Step};
use crate::application::generators::{
    add_dependencies, add_type_packages, annotation, backend_import,
};
use crate::domain::{
    Dialect, ExtensionPoint, Feature, Language, ProjectConfig, framework_def, import_specifier,
};
use crate::error::StackgenResult;

/// Mount path of the auth router.
pub const AUTH_PREFIX: &str = "/api/auth";

const JWT_PACKAGES: &[(&str, &str)] = &[("jsonwebtoken", "^9.0.2"), ("bcryptjs", "^2.4.3")];
const JWT_TYPES: &[(&str, &str)] = &[
    ("@types/jsonwebtoken", "^9.0.5"),
    ("@types/bcryptjs", "^2.4.6"),
];
const PASSPORT_PACKAGES: &[(&str, &str)] = &[
    ("passport", "^0.7.0"),
    ("passport-local", "^1.0.0"),
    ("passport-jwt", "^4.0.1"),
];
const PASSPORT_TYPES: &[(&str, &str)] = &[
    ("@types/passport", "^1.0.16"),
    ("@types/passport-local", "^1.0.38"),
    ("@types/passport-jwt", "^4.0.1"),
];
const OAUTH_PACKAGES: &[(&str, &str)] = &[("passport-google-oauth20", "^2.0.0")];
const OAUTH_TYPES: &[(&str, &str)] = &[("@types/passport-google-oauth20", "^2.0.14")];

pub struct AuthGenerator;

impl Generator for AuthGenerator {
    fn step(&self) -> Step {
        Step::Auth
    }

    fn prerequisites(&self) -> &'static [Step] {
        &[Step::Backend]
    }

    fn is_triggered(&self, config: &ProjectConfig) -> bool {
        config.has_feature(Feature::Auth)
    }

    #[instrument(skip_all, fields(subproject = %ctx.backend.name))]
    fn generate(&self, ctx: &GenerationContext<'_>) -> StackgenResult<()> {
        let entry = ctx.backend_entry();
        ctx.require(self.step(), &entry)?;

        let layers = AuthLayers::for_config(ctx.config);
        let module = ctx.backend_source("src/auth");
        let routes = ctx.backend_source("src/routes/auth");

        self.write_base(ctx, &module, &routes)?;
        if layers.passport {
            self.add_passport(ctx, &module, &routes)?;
        }
        if layers.oauth {
            self.add_oauth(ctx, &module, &routes)?;
        }
        self.mount(ctx, &entry, layers.passport)?;

        let language = ctx.config.backend().language;
        ctx.update_manifest(self.step(), &ctx.backend_dir(), |m| {
            add_dependencies(m, JWT_PACKAGES);
            add_type_packages(m, language, JWT_TYPES);
            if layers.passport {
                add_dependencies(m, PASSPORT_PACKAGES);
                add_type_packages(m, language, PASSPORT_TYPES);
            }
            if layers.oauth {
                add_dependencies(m, OAUTH_PACKAGES);
                add_type_packages(m, language, OAUTH_TYPES);
            }
        })
    }

    fn subproject(&self, ctx: &GenerationContext<'_>) -> PathBuf {
        ctx.backend_dir()
    }
}

/// Which optional layers apply on top of the JWT base.
#[derive(Debug, Clone, Copy)]
struct AuthLayers {
    passport: bool,
    oauth: bool,
}

impl AuthLayers {
    fn for_config(config: &ProjectConfig) -> Self {
        let def = framework_def(config.backend().framework);
        let wanted_passport = config.has_feature(Feature::AuthPassport);
        let passport = wanted_passport && def.supports_feature(Feature::AuthPassport);
        if wanted_passport && !passport {
            warn!(framework = %def.framework, "passport strategies are not available, skipping");
        }
        Self {
            passport,
            oauth: passport && config.has_feature(Feature::AuthOAuth),
        }
    }
}

impl AuthGenerator {
    fn write_base(&self, ctx: &GenerationContext<'_>, module: &Path, routes: &Path) -> StackgenResult<()> {
        let stack = ctx.config.backend();
        let dialect = framework_def(stack.framework).dialect;
        ctx.write(module, &base_module(dialect, stack.language))?;
        let auth_import = import_specifier(stack.framework, "../auth");
        ctx.write(routes, &base_routes(dialect, stack.language, &auth_import))?;
        debug!("wrote JWT auth module and routes");
        Ok(())
    }

    fn add_passport(&self, ctx: &GenerationContext<'_>, module: &Path, routes: &Path) -> StackgenResult<()> {
        let any = annotation(ctx.config.backend().language, ": any");
        ctx.patch(
            self.step(),
            module,
            ExtensionPoint::Imports,
            "import passport from 'passport';
import { Strategy as LocalStrategy } from 'passport-local';
import { Strategy as JwtStrategy, ExtractJwt } from 'passport-jwt';",
        )?;
        ctx.patch(
            self.step(),
            module,
            ExtensionPoint::AuthStrategies,
            PASSPORT_STRATEGIES,
        )?;
        ctx.patch(
            self.step(),
            routes,
            ExtensionPoint::Imports,
            "import passport from 'passport';",
        )?;
        ctx.patch(
            self.step(),
            routes,
            ExtensionPoint::AuthRoutes,
            &format!(
                "router.post('/login/local', passport.authenticate('local', {{ session: false }}), (req{any}, res) => {{
  res.json({{ token: generateToken(req.user) }});
}});
"
            ),
        )
    }

    fn add_oauth(&self, ctx: &GenerationContext<'_>, module: &Path, routes: &Path) -> StackgenResult<()> {
        let any = annotation(ctx.config.backend().language, ": any");
        let callback = format!(
            "http://localhost:{}{AUTH_PREFIX}/google/callback",
            ctx.backend.port
        );
        ctx.patch(
            self.step(),
            module,
            ExtensionPoint::Imports,
            "import { Strategy as GoogleStrategy } from 'passport-google-oauth20';",
        )?;
        ctx.patch(
            self.step(),
            module,
            ExtensionPoint::AuthStrategies,
            &GOOGLE_STRATEGY.replace("__CALLBACK__", &callback),
        )?;
        ctx.patch(
            self.step(),
            routes,
            ExtensionPoint::AuthRoutes,
            &format!(
                "router.get('/google', passport.authenticate('google', {{ scope: ['profile', 'email'], session: false }}));

router.get(
  '/google/callback',
  passport.authenticate('google', {{ session: false, failureRedirect: '/login' }}),
  (req{any}, res) => {{
    res.json({{ token: generateToken(req.user) }});
  }},
);
"
            ),
        )
    }

    /// Mount the router (and passport, when present) on the entry.
    fn mount(&self, ctx: &GenerationContext<'_>, entry: &Path, passport: bool) -> StackgenResult<()> {
        let dialect = framework_def(ctx.config.backend().framework).dialect;

        let mut imports = vec![backend_import(ctx, "authRoutes", "./routes/auth")];
        if passport {
            imports.push(backend_import(ctx, "{ passportInitialize }", "./auth"));
        }
        ctx.patch(self.step(), entry, ExtensionPoint::Imports, &imports.join("\n"))?;

        let mut middleware = Vec::new();
        if passport {
            middleware.push("app.use(passportInitialize);".to_string());
        }
        match dialect {
            Dialect::Koa => {
                middleware.push("app.use(authRoutes.routes());".to_string());
                middleware.push("app.use(authRoutes.allowedMethods());".to_string());
            }
            _ => middleware.push(format!("app.use('{AUTH_PREFIX}', authRoutes);")),
        }
        ctx.patch(
            self.step(),
            entry,
            ExtensionPoint::Middleware,
            &middleware.join("\n"),
        )
    }
}

// ── Snippets ─────────────────────────────────────────────────────────────────

fn base_module(dialect: Dialect, language: Language) -> String {
    let any = annotation(language, ": any");
    let guard = match dialect {
        Dialect::Koa => format!(
            "export async function authenticateJWT(ctx{any}, next) {{
  const header = ctx.get('Authorization');
  const token = header.startsWith('Bearer ') ? header.slice(7) : null;
  if (!token) {{
    ctx.status = 401;
    ctx.body = {{ error: 'Missing token' }};
    return;
  }}
  try {{
    ctx.state.user = verifyToken(token);
  }} catch {{
    ctx.status = 401;
    ctx.body = {{ error: 'Invalid token' }};
    return;
  }}
  await next();
}}"
        ),
        _ => format!(
            "export function authenticateJWT(req{any}, res{any}, next{any}) {{
  const header = req.headers.authorization || '';
  const token = header.startsWith('Bearer ') ? header.slice(7) : null;
  if (!token) {{
    res.status(401).json({{ error: 'Missing token' }});
    return;
  }}
  try {{
    req.user = verifyToken(token);
    next();
  }} catch {{
    res.status(401).json({{ error: 'Invalid token' }});
  }}
}}"
        ),
    };

    format!(
        "import jwt from 'jsonwebtoken';
import bcrypt from 'bcryptjs';
// @stackgen:imports

export const JWT_SECRET = process.env.JWT_SECRET || 'change-me-development';
const TOKEN_TTL = '1h';

// In-memory user store. Replace with a repository backed by your database.
export const users = new Map();

export async function hashPassword(password) {{
  return bcrypt.hash(password, 10);
}}

export async function comparePassword(password, hash) {{
  return bcrypt.compare(password, hash);
}}

export function generateToken(user{any}) {{
  return jwt.sign({{ sub: user.id, email: user.email }}, JWT_SECRET, {{ expiresIn: TOKEN_TTL }});
}}

export function verifyToken(token) {{
  return jwt.verify(token, JWT_SECRET);
}}

{guard}

// @stackgen:auth-strategies
"
    )
}

fn base_routes(dialect: Dialect, language: Language, auth_import: &str) -> String {
    let any = annotation(language, ": any");
    let symbols = "{ authenticateJWT, comparePassword, generateToken, hashPassword, users }";
    match dialect {
        Dialect::Koa => format!(
            "import Router from '@koa/router';
import {symbols} from '{auth_import}';
// @stackgen:imports

const router = new Router({{ prefix: '{AUTH_PREFIX}' }});

router.post('/register', async (ctx{any}) => {{
  const {{ email, password }} = ctx.request.body || {{}};
  if (!email || !password) {{
    ctx.status = 400;
    ctx.body = {{ error: 'email and password are required' }};
    return;
  }}
  if (users.has(email)) {{
    ctx.status = 409;
    ctx.body = {{ error: 'User already exists' }};
    return;
  }}
  const user = {{ id: String(users.size + 1), email, passwordHash: await hashPassword(password) }};
  users.set(email, user);
  ctx.status = 201;
  ctx.body = {{ token: generateToken(user) }};
}});

router.post('/login', async (ctx{any}) => {{
  const {{ email, password }} = ctx.request.body || {{}};
  const user = users.get(email);
  if (!user || !(await comparePassword(password, user.passwordHash))) {{
    ctx.status = 401;
    ctx.body = {{ error: 'Invalid credentials' }};
    return;
  }}
  ctx.body = {{ token: generateToken(user) }};
}});

router.get('/me', authenticateJWT, (ctx{any}) => {{
  ctx.body = {{ user: ctx.state.user }};
}});

// @stackgen:auth-routes

export default router;
"
        ),
        _ => format!(
            "import {{ Router }} from 'express';
import {symbols} from '{auth_import}';
// @stackgen:imports

const router = Router();

router.post('/register', async (req, res) => {{
  const {{ email, password }} = req.body || {{}};
  if (!email || !password) {{
    res.status(400).json({{ error: 'email and password are required' }});
    return;
  }}
  if (users.has(email)) {{
    res.status(409).json({{ error: 'User already exists' }});
    return;
  }}
  const user = {{ id: String(users.size + 1), email, passwordHash: await hashPassword(password) }};
  users.set(email, user);
  res.status(201).json({{ token: generateToken(user) }});
}});

router.post('/login', async (req, res) => {{
  const {{ email, password }} = req.body || {{}};
  const user = users.get(email);
  if (!user || !(await comparePassword(password, user.passwordHash))) {{
    res.status(401).json({{ error: 'Invalid credentials' }});
    return;
  }}
  res.json({{ token: generateToken(user) }});
}});

router.get('/me', authenticateJWT, (req{any}, res) => {{
  res.json({{ user: req.user }});
}});

// @stackgen:auth-routes

export default router;
"
        ),
    }
}

const PASSPORT_STRATEGIES: &str = "passport.use(
  new LocalStrategy({ usernameField: 'email' }, async (email, password, done) => {
    const user = users.get(email);
    if (!user || !(await comparePassword(password, user.passwordHash))) {
      return done(null, false);
    }
    return done(null, user);
  }),
);

passport.use(
  new JwtStrategy(
    { jwtFromRequest: ExtractJwt.fromAuthHeaderAsBearerToken(), secretOrKey: JWT_SECRET },
    (payload, done) => done(null, payload),
  ),
);

export const passportInitialize = passport.initialize();
";

const GOOGLE_STRATEGY: &str = "passport.use(
  new GoogleStrategy(
    {
      clientID: process.env.GOOGLE_CLIENT_ID || '',
      clientSecret: process.env.GOOGLE_CLIENT_SECRET || '',
      callbackURL: process.env.GOOGLE_CALLBACK_URL || '__CALLBACK__',
    },
    (_accessToken, _refreshToken, profile, done) => {
      const email = profile.emails && profile.emails[0] ? profile.emails[0].value : profile.id;
      let user = users.get(email);
      if (!user) {
        user = { id: String(users.size + 1), email, passwordHash: '' };
        users.set(email, user);
      }
      return done(null, user);
    },
  ),
);
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Framework, SourcePatcher};

    #[test]
    fn base_files_expose_their_extension_points() {
        for dialect in [Dialect::Express, Dialect::Koa] {
            let module = base_module(dialect, Language::TypeScript);
            assert!(SourcePatcher::has_point(&module, ExtensionPoint::Imports));
            assert!(SourcePatcher::has_point(&module, ExtensionPoint::AuthStrategies));

            let routes = base_routes(dialect, Language::TypeScript, "../auth.js");
            assert!(SourcePatcher::has_point(&routes, ExtensionPoint::Imports));
            assert!(SourcePatcher::has_point(&routes, ExtensionPoint::AuthRoutes));
        }
    }

    #[test]
    fn javascript_output_has_no_type_annotations() {
        let module = base_module(Dialect::Express, Language::JavaScript);
        assert!(!module.contains(": any"));
        let module = base_module(Dialect::Express, Language::TypeScript);
        assert!(module.contains("req: any"));
    }

    #[test]
    fn koa_router_carries_its_own_prefix() {
        let routes = base_routes(Dialect::Koa, Language::JavaScript, "../auth.js");
        assert!(routes.contains("prefix: '/api/auth'"));
        assert!(routes.contains("ctx.state.user"));
    }

    #[test]
    fn oauth_without_passport_support_is_not_layered() {
        let config = ProjectConfig::builder("demo")
            .backend(Language::TypeScript, Framework::Express)
            .feature(Feature::AuthOAuth)
            .build()
            .unwrap();
        let layers = AuthLayers::for_config(&config);
        assert!(layers.passport);
        assert!(layers.oauth);

        let config = ProjectConfig::builder("demo")
            .feature(Feature::Auth)
            .build()
            .unwrap();
        let layers = AuthLayers::for_config(&config);
        assert!(!layers.passport);
        assert!(!layers.oauth);
    }
}
